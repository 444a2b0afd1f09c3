use thiserror::Error;

use crate::model::{QuestionError, QuizResultError, SettingsError, ThemeError};
use crate::quiz::QuizError;

/// Umbrella error for callers that do not care which domain rule failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Theme(#[from] ThemeError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Result(#[from] QuizResultError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
}
