use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{ThemeId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizResultError {
    #[error("a quiz result needs at least one question")]
    NoQuestions,

    #[error("score {score} exceeds total {total}")]
    ScoreOutOfRange { score: u32, total: u32 },
}

/// Integer percentage of `score` over `total`, rounded half up.
///
/// Returns 0 when `total` is 0.
#[must_use]
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let score = u64::from(score.min(total));
    let total = u64::from(total);
    // floor(score * 100 / total + 1/2)
    let rounded = (score * 200 + total) / (2 * total);
    u32::try_from(rounded).unwrap_or(100)
}

/// Summary of one finished playthrough, handed to the result recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    theme_id: ThemeId,
    theme_name: String,
    user_id: UserId,
    score: u32,
    total_questions: u32,
    completed_at: DateTime<Utc>,
}

impl QuizResult {
    /// # Errors
    ///
    /// Returns `QuizResultError` if `total_questions` is 0 or `score` exceeds it.
    pub fn new(
        theme_id: ThemeId,
        theme_name: impl Into<String>,
        user_id: UserId,
        score: u32,
        total_questions: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, QuizResultError> {
        if total_questions == 0 {
            return Err(QuizResultError::NoQuestions);
        }
        if score > total_questions {
            return Err(QuizResultError::ScoreOutOfRange {
                score,
                total: total_questions,
            });
        }
        Ok(Self {
            theme_id,
            theme_name: theme_name.into(),
            user_id,
            score,
            total_questions,
            completed_at,
        })
    }

    #[must_use]
    pub fn theme_id(&self) -> ThemeId {
        self.theme_id
    }

    #[must_use]
    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn percentage(&self) -> u32 {
        percentage(self.score, self.total_questions)
    }
}

/// Aggregate figures shown on a user's profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub quizzes_taken: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
    /// Mean of the per-quiz percentages, rounded half up.
    pub average_score: u32,
}

impl UserStats {
    #[must_use]
    pub fn from_results(results: &[QuizResult]) -> Self {
        let mut correct_answers = 0_u32;
        let mut total_questions = 0_u32;
        let mut percentage_sum = 0_u64;
        for result in results {
            correct_answers = correct_answers.saturating_add(result.score());
            total_questions = total_questions.saturating_add(result.total_questions());
            percentage_sum += u64::from(result.percentage());
        }
        let quizzes_taken = u32::try_from(results.len()).unwrap_or(u32::MAX);
        Self::from_totals(quizzes_taken, correct_answers, total_questions, percentage_sum)
    }

    /// Stats from sums aggregated elsewhere, e.g. by a database query.
    ///
    /// `percentage_sum` is the sum of the per-quiz percentages.
    #[must_use]
    pub fn from_totals(
        quizzes_taken: u32,
        correct_answers: u32,
        total_questions: u32,
        percentage_sum: u64,
    ) -> Self {
        if quizzes_taken == 0 {
            return Self::default();
        }
        let quizzes = u64::from(quizzes_taken);
        // floor(sum / quizzes + 1/2)
        let average = (percentage_sum * 2 + quizzes) / (2 * quizzes);
        Self {
            quizzes_taken,
            correct_answers,
            total_questions,
            average_score: u32::try_from(average.min(100)).unwrap_or(100),
        }
    }
}
