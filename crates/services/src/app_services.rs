use std::sync::Arc;

use quiz_core::model::{QuizSettings, UserId};
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::identity::CurrentUser;
use crate::question_service::QuestionService;
use crate::quiz::{QuizHistoryService, QuizLoopService, QuizRunner};
use crate::theme_service::ThemeService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    user: Arc<dyn CurrentUser>,
    themes: Arc<ThemeService>,
    questions: Arc<QuestionService>,
    quiz_loop: Arc<QuizLoopService>,
    history: Arc<QuizHistoryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if connecting or migrating fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: QuizSettings,
        user: Arc<dyn CurrentUser>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        tracing::info!(db_url, "storage ready");
        Ok(Self::from_storage(&storage, clock, settings, user))
    }

    /// Build services over fresh in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock, settings: QuizSettings, user: Arc<dyn CurrentUser>) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, settings, user)
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        settings: QuizSettings,
        user: Arc<dyn CurrentUser>,
    ) -> Self {
        let themes = Arc::new(ThemeService::new(
            clock,
            Arc::clone(&storage.themes),
            Arc::clone(&user),
        ));
        let questions = Arc::new(QuestionService::new(
            clock,
            Arc::clone(&storage.themes),
            Arc::clone(&storage.questions),
            Arc::clone(&user),
        ));
        let quiz_loop = Arc::new(
            QuizLoopService::new(
                clock,
                Arc::clone(&storage.themes),
                Arc::clone(&storage.questions),
                Arc::clone(&storage.results),
                Arc::clone(&user),
            )
            .with_settings(settings),
        );
        let history = Arc::new(QuizHistoryService::new(Arc::clone(&storage.results)));

        Self {
            user,
            themes,
            questions,
            quiz_loop,
            history,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.current_user_id()
    }

    #[must_use]
    pub fn themes(&self) -> Arc<ThemeService> {
        Arc::clone(&self.themes)
    }

    #[must_use]
    pub fn questions(&self) -> Arc<QuestionService> {
        Arc::clone(&self.questions)
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    /// A runner that drives playthroughs with one countdown unit per second.
    #[must_use]
    pub fn runner(&self) -> QuizRunner {
        QuizRunner::new(Arc::clone(&self.quiz_loop))
    }

    #[must_use]
    pub fn history(&self) -> Arc<QuizHistoryService> {
        Arc::clone(&self.history)
    }
}
