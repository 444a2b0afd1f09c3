use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    Question, QuestionId, QuizResult, ResultId, Theme, ThemeId, UserId, UserStats,
    ValidatedQuestion, ValidatedTheme,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A theme that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewThemeRecord {
    pub fields: ValidatedTheme,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// A question that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewQuestionRecord {
    pub fields: ValidatedQuestion,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// A recorded quiz result together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResultRow {
    pub id: ResultId,
    pub result: QuizResult,
}

impl QuizResultRow {
    #[must_use]
    pub fn new(id: ResultId, result: QuizResult) -> Self {
        Self { id, result }
    }
}

/// Repository contract for quiz themes.
#[async_trait]
pub trait ThemeRepository: Send + Sync {
    /// Insert a theme with a zero question count and return it with its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the theme cannot be stored.
    async fn insert_theme(&self, theme: NewThemeRecord) -> Result<Theme, StorageError>;

    /// Persist edited fields of an existing theme.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the theme does not exist.
    async fn update_theme(&self, theme: &Theme) -> Result<(), StorageError>;

    /// Fetch a theme by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_theme(&self, id: ThemeId) -> Result<Option<Theme>, StorageError>;

    /// Public themes, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_public_themes(&self, limit: u32) -> Result<Vec<Theme>, StorageError>;

    /// Public themes plus the user's own private ones, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_visible_themes(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<Theme>, StorageError>;

    /// Themes created by `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_user_themes(&self, user: UserId, limit: u32)
    -> Result<Vec<Theme>, StorageError>;

    /// Delete a theme and its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the theme does not exist.
    async fn delete_theme(&self, id: ThemeId) -> Result<(), StorageError>;

    /// Atomically add `delta` to the denormalized question count, clamping at
    /// zero, and return the new count.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the theme does not exist.
    async fn adjust_question_count(&self, id: ThemeId, delta: i32) -> Result<u32, StorageError>;
}

/// Repository contract for questions.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn insert_question(&self, question: NewQuestionRecord) -> Result<Question, StorageError>;

    /// Insert several questions at once; either all are stored or none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any question cannot be stored.
    async fn insert_questions(
        &self,
        questions: Vec<NewQuestionRecord>,
    ) -> Result<Vec<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError>;

    /// Questions of a theme, oldest first. Stored rows that no longer form a
    /// valid `Question` (fewer than two options, blank text) are left out.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_questions(&self, theme_id: ThemeId) -> Result<Vec<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question does not exist.
    async fn update_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Delete a question and return what was removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question does not exist.
    async fn delete_question(&self, id: QuestionId) -> Result<Question, StorageError>;
}

/// Repository contract for finished quiz results.
#[async_trait]
pub trait QuizResultRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, result: &QuizResult) -> Result<ResultId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_result(&self, id: ResultId) -> Result<QuizResult, StorageError>;

    /// Results of a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_user_results(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<QuizResultRow>, StorageError>;

    /// Totals over every result of a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn user_stats(&self, user: UserId) -> Result<UserStats, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct Tables {
    themes: HashMap<ThemeId, Theme>,
    questions: HashMap<QuestionId, Question>,
    results: Vec<QuizResultRow>,
    next_theme_id: u64,
    next_question_id: u64,
}

impl Tables {
    fn next_theme_id(&mut self) -> ThemeId {
        self.next_theme_id += 1;
        ThemeId::new(self.next_theme_id)
    }

    fn next_question_id(&mut self) -> QuestionId {
        self.next_question_id += 1;
        QuestionId::new(self.next_question_id)
    }
}

fn newest_first(mut themes: Vec<Theme>, limit: u32) -> Vec<Theme> {
    themes.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(&a.id()))
    });
    themes.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    themes
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl ThemeRepository for InMemoryRepository {
    async fn insert_theme(&self, theme: NewThemeRecord) -> Result<Theme, StorageError> {
        let mut guard = self.lock()?;
        let id = guard.next_theme_id();
        let theme = Theme::new(id, theme.fields, theme.created_by, theme.created_at);
        guard.themes.insert(id, theme.clone());
        Ok(theme)
    }

    async fn update_theme(&self, theme: &Theme) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let stored = guard
            .themes
            .get_mut(&theme.id())
            .ok_or(StorageError::NotFound)?;
        let count = stored.questions_count();
        *stored = theme.clone();
        stored.set_questions_count(count);
        Ok(())
    }

    async fn get_theme(&self, id: ThemeId) -> Result<Option<Theme>, StorageError> {
        Ok(self.lock()?.themes.get(&id).cloned())
    }

    async fn list_public_themes(&self, limit: u32) -> Result<Vec<Theme>, StorageError> {
        let guard = self.lock()?;
        let themes = guard.themes.values().filter(|t| t.is_public()).cloned();
        Ok(newest_first(themes.collect(), limit))
    }

    async fn list_visible_themes(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<Theme>, StorageError> {
        let guard = self.lock()?;
        let themes = guard
            .themes
            .values()
            .filter(|t| t.is_visible_to(Some(user)))
            .cloned();
        Ok(newest_first(themes.collect(), limit))
    }

    async fn list_user_themes(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<Theme>, StorageError> {
        let guard = self.lock()?;
        let themes = guard
            .themes
            .values()
            .filter(|t| t.created_by() == user)
            .cloned();
        Ok(newest_first(themes.collect(), limit))
    }

    async fn delete_theme(&self, id: ThemeId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.themes.remove(&id).ok_or(StorageError::NotFound)?;
        guard.questions.retain(|_, q| q.theme_id() != id);
        Ok(())
    }

    async fn adjust_question_count(&self, id: ThemeId, delta: i32) -> Result<u32, StorageError> {
        let mut guard = self.lock()?;
        let theme = guard.themes.get_mut(&id).ok_or(StorageError::NotFound)?;
        let count = theme.questions_count().saturating_add_signed(delta);
        theme.set_questions_count(count);
        Ok(count)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(&self, question: NewQuestionRecord) -> Result<Question, StorageError> {
        let mut stored = self.insert_questions(vec![question]).await?;
        stored.pop().ok_or(StorageError::Conflict)
    }

    async fn insert_questions(
        &self,
        questions: Vec<NewQuestionRecord>,
    ) -> Result<Vec<Question>, StorageError> {
        let mut guard = self.lock()?;
        if questions
            .iter()
            .any(|q| !guard.themes.contains_key(&q.fields.theme_id))
        {
            return Err(StorageError::NotFound);
        }
        let mut out = Vec::with_capacity(questions.len());
        for record in questions {
            let id = guard.next_question_id();
            let question = Question::new(id, record.fields, record.created_by, record.created_at);
            guard.questions.insert(id, question.clone());
            out.push(question);
        }
        Ok(out)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        Ok(self.lock()?.questions.get(&id).cloned())
    }

    async fn list_questions(&self, theme_id: ThemeId) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        let mut questions: Vec<Question> = guard
            .questions
            .values()
            .filter(|q| q.theme_id() == theme_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.created_at(), q.id()));
        Ok(questions)
    }

    async fn update_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let stored = guard
            .questions
            .get_mut(&question.id())
            .ok_or(StorageError::NotFound)?;
        *stored = question.clone();
        Ok(())
    }

    async fn delete_question(&self, id: QuestionId) -> Result<Question, StorageError> {
        self.lock()?
            .questions
            .remove(&id)
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl QuizResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &QuizResult) -> Result<ResultId, StorageError> {
        let mut guard = self.lock()?;
        let next = i64::try_from(guard.results.len())
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?
            + 1;
        let id = ResultId::new(next);
        guard.results.push(QuizResultRow::new(id, result.clone()));
        Ok(id)
    }

    async fn get_result(&self, id: ResultId) -> Result<QuizResult, StorageError> {
        let guard = self.lock()?;
        guard
            .results
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.result.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_user_results(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<QuizResultRow>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<QuizResultRow> = guard
            .results
            .iter()
            .filter(|row| row.result.user_id() == user)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.result
                .completed_at()
                .cmp(&a.result.completed_at())
                .then_with(|| b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn user_stats(&self, user: UserId) -> Result<UserStats, StorageError> {
        let guard = self.lock()?;
        let results: Vec<QuizResult> = guard
            .results
            .iter()
            .filter(|row| row.result.user_id() == user)
            .map(|row| row.result.clone())
            .collect();
        Ok(UserStats::from_results(&results))
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub themes: Arc<dyn ThemeRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub results: Arc<dyn QuizResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            themes: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            results: Arc::new(repo),
        }
    }
}
