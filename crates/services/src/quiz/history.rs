use std::sync::Arc;

use quiz_core::model::{UserId, UserStats};
use storage::repository::{QuizResultRepository, QuizResultRow};

use crate::error::HistoryServiceError;

/// Read side of recorded quiz results.
#[derive(Clone)]
pub struct QuizHistoryService {
    results: Arc<dyn QuizResultRepository>,
}

impl QuizHistoryService {
    #[must_use]
    pub fn new(results: Arc<dyn QuizResultRepository>) -> Self {
        Self { results }
    }

    /// Most recent results of `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryServiceError::Storage` if repository access fails.
    pub async fn recent_results(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<QuizResultRow>, HistoryServiceError> {
        Ok(self.results.list_user_results(user, limit).await?)
    }

    /// Totals and average percentage over the user's recorded quizzes.
    ///
    /// # Errors
    ///
    /// Returns `HistoryServiceError::Storage` if repository access fails.
    pub async fn stats(&self, user: UserId) -> Result<UserStats, HistoryServiceError> {
        Ok(self.results.user_stats(user).await?)
    }
}
