//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuestionError, ThemeError, ThemeId};
use quiz_core::quiz::QuizError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ThemeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ThemeServiceError {
    #[error("sign in to manage themes")]
    NotSignedIn,
    #[error("theme {0} belongs to another user")]
    NotOwner(ThemeId),
    #[error(transparent)]
    Theme(#[from] ThemeError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuestionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionServiceError {
    #[error("sign in to manage questions")]
    NotSignedIn,
    #[error("theme {0} belongs to another user")]
    NotOwner(ThemeId),
    #[error("question belongs to theme {expected}, not {found}")]
    ThemeMismatch { expected: ThemeId, found: ThemeId },
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the quiz loop and its runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("theme {theme_id} has no questions to play")]
    Unplayable { theme_id: ThemeId },
    #[error("quiz is not completed yet")]
    NotCompleted,
    #[error("no signed-in user to record the result for")]
    NotSignedIn,
    #[error("quiz runner has stopped")]
    RunnerStopped,
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizHistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
