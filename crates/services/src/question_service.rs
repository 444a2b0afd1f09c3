use std::sync::Arc;

use quiz_core::model::{Question, QuestionDraft, QuestionId, ThemeId, UserId};
use storage::repository::{NewQuestionRecord, QuestionRepository, StorageError, ThemeRepository};

use crate::Clock;
use crate::error::QuestionServiceError;
use crate::identity::CurrentUser;

/// Question authoring. Keeps the theme's question counter in step on a
/// best-effort basis.
#[derive(Clone)]
pub struct QuestionService {
    clock: Clock,
    themes: Arc<dyn ThemeRepository>,
    questions: Arc<dyn QuestionRepository>,
    user: Arc<dyn CurrentUser>,
}

impl QuestionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        themes: Arc<dyn ThemeRepository>,
        questions: Arc<dyn QuestionRepository>,
        user: Arc<dyn CurrentUser>,
    ) -> Self {
        Self {
            clock,
            themes,
            questions,
            user,
        }
    }

    async fn require_theme_owner(&self, theme_id: ThemeId) -> Result<UserId, QuestionServiceError> {
        let user = self
            .user
            .current_user_id()
            .ok_or(QuestionServiceError::NotSignedIn)?;
        let theme = self
            .themes
            .get_theme(theme_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        if theme.created_by() != user {
            return Err(QuestionServiceError::NotOwner(theme_id));
        }
        Ok(user)
    }

    async fn adjust_count(&self, theme_id: ThemeId, delta: i32) {
        match self.themes.adjust_question_count(theme_id, delta).await {
            Ok(count) => tracing::debug!(%theme_id, count, "theme question count adjusted"),
            Err(err) => tracing::warn!(
                %theme_id,
                delta,
                error = %err,
                "failed to adjust theme question count"
            ),
        }
    }

    /// Add a question to a theme the current user owns.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Question` for validation failures,
    /// `QuestionServiceError::NotOwner`/`NotSignedIn` for permission failures and
    /// `QuestionServiceError::Storage` if persistence fails.
    pub async fn create_question(
        &self,
        draft: QuestionDraft,
    ) -> Result<Question, QuestionServiceError> {
        let theme_id = draft.theme_id;
        let mut created = self.create_questions(theme_id, vec![draft]).await?;
        created.pop().ok_or(QuestionServiceError::Storage(StorageError::Conflict))
    }

    /// Add several questions to one theme. Nothing is stored unless every
    /// draft validates.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::ThemeMismatch` if a draft targets another
    /// theme, plus the errors of [`QuestionService::create_question`].
    pub async fn create_questions(
        &self,
        theme_id: ThemeId,
        drafts: Vec<QuestionDraft>,
    ) -> Result<Vec<Question>, QuestionServiceError> {
        let user = self.require_theme_owner(theme_id).await?;
        let now = self.clock.now();

        let mut records = Vec::with_capacity(drafts.len());
        for draft in drafts {
            if draft.theme_id != theme_id {
                return Err(QuestionServiceError::ThemeMismatch {
                    expected: theme_id,
                    found: draft.theme_id,
                });
            }
            records.push(NewQuestionRecord {
                fields: draft.validate()?,
                created_by: user,
                created_at: now,
            });
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let created = self.questions.insert_questions(records).await?;
        let delta = i32::try_from(created.len()).unwrap_or(i32::MAX);
        self.adjust_count(theme_id, delta).await;
        tracing::info!(%theme_id, count = created.len(), "questions created");
        Ok(created)
    }

    /// Replace the text and options of a question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::ThemeMismatch` when the draft moves the
    /// question to another theme, plus validation, permission and storage errors.
    pub async fn update_question(
        &self,
        id: QuestionId,
        draft: QuestionDraft,
    ) -> Result<Question, QuestionServiceError> {
        let mut question = self
            .questions
            .get_question(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        if draft.theme_id != question.theme_id() {
            return Err(QuestionServiceError::ThemeMismatch {
                expected: question.theme_id(),
                found: draft.theme_id,
            });
        }
        self.require_theme_owner(question.theme_id()).await?;

        question.apply_edit(draft.validate()?);
        self.questions.update_question(&question).await?;
        Ok(question)
    }

    /// # Errors
    ///
    /// Returns permission errors for someone else's theme and
    /// `QuestionServiceError::Storage` if the question is missing or deletion fails.
    pub async fn delete_question(&self, id: QuestionId) -> Result<(), QuestionServiceError> {
        let question = self
            .questions
            .get_question(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        self.require_theme_owner(question.theme_id()).await?;

        let removed = self.questions.delete_question(id).await?;
        self.adjust_count(removed.theme_id(), -1).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if repository access fails.
    pub async fn get_question(
        &self,
        id: QuestionId,
    ) -> Result<Option<Question>, QuestionServiceError> {
        Ok(self.questions.get_question(id).await?)
    }

    /// Questions of a theme, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if repository access fails.
    pub async fn list_questions(
        &self,
        theme_id: ThemeId,
    ) -> Result<Vec<Question>, QuestionServiceError> {
        Ok(self.questions.list_questions(theme_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use quiz_core::model::{Theme, ThemeDraft};
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryRepository, NewThemeRecord};

    use crate::identity::SignedInUser;

    async fn seeded_theme(repo: &InMemoryRepository, owner: UserId) -> Theme {
        repo.insert_theme(NewThemeRecord {
            fields: ThemeDraft {
                title: "Gastronomía".into(),
                description: "Platos típicos".into(),
                icon: "bowl".into(),
                colors: vec!["#FFB703".into()],
                is_public: true,
            }
            .validate()
            .unwrap(),
            created_by: owner,
            created_at: fixed_now(),
        })
        .await
        .unwrap()
    }

    fn ceviche(theme_id: ThemeId) -> QuestionDraft {
        QuestionDraft::with_answers(
            theme_id,
            "¿Ingrediente base del ceviche?",
            ["Pescado", "Pollo", "Papa"],
            0,
        )
    }

    fn service(repo: &InMemoryRepository, user: UserId) -> QuestionService {
        QuestionService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(SignedInUser::new(user)),
        )
    }

    #[tokio::test]
    async fn create_and_delete_keep_the_counter_in_step() {
        let repo = InMemoryRepository::new();
        let owner = UserId::generate();
        let theme = seeded_theme(&repo, owner).await;
        let svc = service(&repo, owner);

        let created = svc
            .create_questions(theme.id(), vec![ceviche(theme.id()), ceviche(theme.id())])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        let count = repo.get_theme(theme.id()).await.unwrap().unwrap().questions_count();
        assert_eq!(count, 2);

        svc.delete_question(created[0].id()).await.unwrap();
        let count = repo.get_theme(theme.id()).await.unwrap().unwrap().questions_count();
        assert_eq!(count, 1);
        assert_eq!(svc.list_questions(theme.id()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_drafts_store_nothing() {
        let repo = InMemoryRepository::new();
        let owner = UserId::generate();
        let theme = seeded_theme(&repo, owner).await;
        let svc = service(&repo, owner);

        let no_correct = QuestionDraft::with_answers(theme.id(), "¿?", ["a", "b"], 9);
        let err = svc
            .create_questions(theme.id(), vec![ceviche(theme.id()), no_correct])
            .await
            .unwrap_err();
        assert!(matches!(err, QuestionServiceError::Question(_)));
        assert!(svc.list_questions(theme.id()).await.unwrap().is_empty());

        let err = svc
            .create_questions(theme.id(), vec![ceviche(ThemeId::new(77))])
            .await
            .unwrap_err();
        assert!(matches!(err, QuestionServiceError::ThemeMismatch { .. }));
    }

    #[tokio::test]
    async fn other_users_cannot_author_questions() {
        let repo = InMemoryRepository::new();
        let owner = UserId::generate();
        let theme = seeded_theme(&repo, owner).await;

        let err = service(&repo, UserId::generate())
            .create_question(ceviche(theme.id()))
            .await
            .unwrap_err();
        assert!(matches!(err, QuestionServiceError::NotOwner(_)));
    }

    #[tokio::test]
    async fn update_replaces_text_and_options() {
        let repo = InMemoryRepository::new();
        let owner = UserId::generate();
        let theme = seeded_theme(&repo, owner).await;
        let svc = service(&repo, owner);
        let question = svc.create_question(ceviche(theme.id())).await.unwrap();

        let edit = QuestionDraft::with_answers(
            theme.id(),
            "¿Bebida de maíz morado?",
            ["Chicha morada", "Inca Kola"],
            0,
        );
        let updated = svc.update_question(question.id(), edit).await.unwrap();
        assert_eq!(updated.text(), "¿Bebida de maíz morado?");
        let stored = svc.get_question(question.id()).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    struct BrokenCounter(InMemoryRepository);

    #[async_trait]
    impl ThemeRepository for BrokenCounter {
        async fn insert_theme(&self, theme: NewThemeRecord) -> Result<Theme, StorageError> {
            self.0.insert_theme(theme).await
        }
        async fn update_theme(&self, theme: &Theme) -> Result<(), StorageError> {
            self.0.update_theme(theme).await
        }
        async fn get_theme(&self, id: ThemeId) -> Result<Option<Theme>, StorageError> {
            self.0.get_theme(id).await
        }
        async fn list_public_themes(&self, limit: u32) -> Result<Vec<Theme>, StorageError> {
            self.0.list_public_themes(limit).await
        }
        async fn list_visible_themes(
            &self,
            user: UserId,
            limit: u32,
        ) -> Result<Vec<Theme>, StorageError> {
            self.0.list_visible_themes(user, limit).await
        }
        async fn list_user_themes(
            &self,
            user: UserId,
            limit: u32,
        ) -> Result<Vec<Theme>, StorageError> {
            self.0.list_user_themes(user, limit).await
        }
        async fn delete_theme(&self, id: ThemeId) -> Result<(), StorageError> {
            self.0.delete_theme(id).await
        }
        async fn adjust_question_count(
            &self,
            _id: ThemeId,
            _delta: i32,
        ) -> Result<u32, StorageError> {
            Err(StorageError::Connection("counter offline".into()))
        }
    }

    #[tokio::test]
    async fn counter_failures_do_not_fail_creation() {
        let repo = InMemoryRepository::new();
        let owner = UserId::generate();
        let theme = seeded_theme(&repo, owner).await;
        let svc = QuestionService::new(
            fixed_clock(),
            Arc::new(BrokenCounter(repo.clone())),
            Arc::new(repo.clone()),
            Arc::new(SignedInUser::new(owner)),
        );

        let question = svc.create_question(ceviche(theme.id())).await.unwrap();
        assert_eq!(question.theme_id(), theme.id());
        let count = repo.get_theme(theme.id()).await.unwrap().unwrap().questions_count();
        assert_eq!(count, 0);
    }
}
