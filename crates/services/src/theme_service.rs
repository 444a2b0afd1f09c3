use std::sync::Arc;

use quiz_core::model::{Theme, ThemeDraft, ThemeId, UserId};
use storage::repository::{NewThemeRecord, StorageError, ThemeRepository};
use tokio::sync::broadcast;

use crate::Clock;
use crate::error::ThemeServiceError;
use crate::identity::CurrentUser;

const DEFAULT_CHANGE_CAPACITY: usize = 64;

/// A mutation made through a `ThemeService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeChange {
    Created(Theme),
    Updated(Theme),
    Deleted(ThemeId),
}

impl ThemeChange {
    #[must_use]
    pub fn theme_id(&self) -> ThemeId {
        match self {
            ThemeChange::Created(theme) | ThemeChange::Updated(theme) => theme.id(),
            ThemeChange::Deleted(id) => *id,
        }
    }
}

/// Publishes theme mutations to whoever subscribed on this instance.
///
/// Each subscriber owns its `broadcast::Receiver`; dropping it unsubscribes.
/// A subscriber that falls more than the channel capacity behind sees
/// `RecvError::Lagged` and skips to the newest changes.
#[derive(Debug, Clone)]
pub struct ThemeChanges {
    sender: broadcast::Sender<ThemeChange>,
}

impl ThemeChanges {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ThemeChange> {
        self.sender.subscribe()
    }

    /// Returns how many subscribers received the change.
    pub fn publish(&self, change: ThemeChange) -> usize {
        self.sender.send(change).unwrap_or(0)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ThemeChanges {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_CAPACITY)
    }
}

/// Theme authoring and browsing.
#[derive(Clone)]
pub struct ThemeService {
    clock: Clock,
    themes: Arc<dyn ThemeRepository>,
    user: Arc<dyn CurrentUser>,
    changes: ThemeChanges,
}

impl ThemeService {
    #[must_use]
    pub fn new(clock: Clock, themes: Arc<dyn ThemeRepository>, user: Arc<dyn CurrentUser>) -> Self {
        Self {
            clock,
            themes,
            user,
            changes: ThemeChanges::default(),
        }
    }

    #[must_use]
    pub fn changes(&self) -> &ThemeChanges {
        &self.changes
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ThemeChange> {
        self.changes.subscribe()
    }

    fn require_user(&self) -> Result<UserId, ThemeServiceError> {
        self.user
            .current_user_id()
            .ok_or(ThemeServiceError::NotSignedIn)
    }

    async fn owned_theme(&self, id: ThemeId) -> Result<Theme, ThemeServiceError> {
        let user = self.require_user()?;
        let theme = self
            .themes
            .get_theme(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        if theme.created_by() != user {
            return Err(ThemeServiceError::NotOwner(id));
        }
        Ok(theme)
    }

    /// Create a theme owned by the current user.
    ///
    /// # Errors
    ///
    /// Returns `ThemeServiceError::NotSignedIn` without a current user,
    /// `ThemeServiceError::Theme` for validation failures and
    /// `ThemeServiceError::Storage` if persistence fails.
    pub async fn create_theme(&self, draft: ThemeDraft) -> Result<Theme, ThemeServiceError> {
        let user = self.require_user()?;
        let fields = draft.validate()?;
        let theme = self
            .themes
            .insert_theme(NewThemeRecord {
                fields,
                created_by: user,
                created_at: self.clock.now(),
            })
            .await?;

        tracing::info!(theme_id = %theme.id(), title = theme.title(), "theme created");
        self.changes.publish(ThemeChange::Created(theme.clone()));
        Ok(theme)
    }

    /// Replace the editable fields of a theme the current user owns.
    ///
    /// # Errors
    ///
    /// Returns `ThemeServiceError::NotOwner` for someone else's theme,
    /// `ThemeServiceError::Theme` for validation failures and
    /// `ThemeServiceError::Storage` if the theme is missing or persistence fails.
    pub async fn update_theme(
        &self,
        id: ThemeId,
        draft: ThemeDraft,
    ) -> Result<Theme, ThemeServiceError> {
        let mut theme = self.owned_theme(id).await?;
        theme.apply_edit(draft.validate()?);
        self.themes.update_theme(&theme).await?;

        self.changes.publish(ThemeChange::Updated(theme.clone()));
        Ok(theme)
    }

    /// Delete a theme the current user owns, together with its questions.
    ///
    /// # Errors
    ///
    /// Returns `ThemeServiceError::NotOwner` for someone else's theme and
    /// `ThemeServiceError::Storage` if the theme is missing or deletion fails.
    pub async fn delete_theme(&self, id: ThemeId) -> Result<(), ThemeServiceError> {
        self.owned_theme(id).await?;
        self.themes.delete_theme(id).await?;

        tracing::info!(theme_id = %id, "theme deleted");
        self.changes.publish(ThemeChange::Deleted(id));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ThemeServiceError::Storage` if repository access fails.
    pub async fn get_theme(&self, id: ThemeId) -> Result<Option<Theme>, ThemeServiceError> {
        Ok(self.themes.get_theme(id).await?)
    }

    /// # Errors
    ///
    /// Returns `ThemeServiceError::Storage` if repository access fails.
    pub async fn list_public_themes(&self, limit: u32) -> Result<Vec<Theme>, ThemeServiceError> {
        Ok(self.themes.list_public_themes(limit).await?)
    }

    /// Public themes plus the current user's private ones. Without a user
    /// this is the public list.
    ///
    /// # Errors
    ///
    /// Returns `ThemeServiceError::Storage` if repository access fails.
    pub async fn list_visible_themes(&self, limit: u32) -> Result<Vec<Theme>, ThemeServiceError> {
        let themes = match self.user.current_user_id() {
            Some(user) => self.themes.list_visible_themes(user, limit).await?,
            None => self.themes.list_public_themes(limit).await?,
        };
        Ok(themes)
    }

    /// # Errors
    ///
    /// Returns `ThemeServiceError::NotSignedIn` without a current user and
    /// `ThemeServiceError::Storage` if repository access fails.
    pub async fn list_my_themes(&self, limit: u32) -> Result<Vec<Theme>, ThemeServiceError> {
        let user = self.require_user()?;
        Ok(self.themes.list_user_themes(user, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    use crate::identity::{Anonymous, SignedInUser};

    fn draft(title: &str, is_public: bool) -> ThemeDraft {
        ThemeDraft {
            title: title.into(),
            description: "Sobre el Perú".into(),
            icon: "sun".into(),
            colors: vec!["#D91023".into()],
            is_public,
        }
    }

    fn service(repo: &InMemoryRepository, user: Arc<dyn CurrentUser>) -> ThemeService {
        ThemeService::new(fixed_clock(), Arc::new(repo.clone()), user)
    }

    #[tokio::test]
    async fn mutations_are_published_to_subscribers() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo, Arc::new(SignedInUser::new(UserId::generate())));
        let mut rx = svc.subscribe();

        let theme = svc.create_theme(draft("Comida", true)).await.unwrap();
        let updated = svc
            .update_theme(theme.id(), draft("Comida peruana", true))
            .await
            .unwrap();
        svc.delete_theme(theme.id()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), ThemeChange::Created(theme.clone()));
        assert_eq!(rx.recv().await.unwrap(), ThemeChange::Updated(updated));
        assert_eq!(rx.recv().await.unwrap(), ThemeChange::Deleted(theme.id()));
    }

    #[tokio::test]
    async fn publishers_are_scoped_to_their_service() {
        let repo = InMemoryRepository::new();
        let user: Arc<dyn CurrentUser> = Arc::new(SignedInUser::new(UserId::generate()));
        let first = service(&repo, Arc::clone(&user));
        let second = service(&repo, user);
        let mut other = second.subscribe();

        first.create_theme(draft("Danzas", true)).await.unwrap();
        assert!(matches!(
            other.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn dropping_the_receiver_unsubscribes() {
        let changes = ThemeChanges::new(4);
        let rx = changes.subscribe();
        assert_eq!(changes.subscriber_count(), 1);
        drop(rx);
        assert_eq!(changes.subscriber_count(), 0);
        assert_eq!(changes.publish(ThemeChange::Deleted(ThemeId::new(1))), 0);
    }

    #[tokio::test]
    async fn only_the_owner_may_edit() {
        let repo = InMemoryRepository::new();
        let owner = service(&repo, Arc::new(SignedInUser::new(UserId::generate())));
        let intruder = service(&repo, Arc::new(SignedInUser::new(UserId::generate())));
        let theme = owner.create_theme(draft("Volcanes", true)).await.unwrap();

        let err = intruder
            .update_theme(theme.id(), draft("Mío", true))
            .await
            .unwrap_err();
        assert!(matches!(err, ThemeServiceError::NotOwner(id) if id == theme.id()));
        assert!(matches!(
            intruder.delete_theme(theme.id()).await,
            Err(ThemeServiceError::NotOwner(_))
        ));
    }

    #[tokio::test]
    async fn anonymous_users_browse_public_themes_only() {
        let repo = InMemoryRepository::new();
        let author = service(&repo, Arc::new(SignedInUser::new(UserId::generate())));
        author.create_theme(draft("Pública", true)).await.unwrap();
        author.create_theme(draft("Privada", false)).await.unwrap();

        let guest = service(&repo, Arc::new(Anonymous));
        assert_eq!(guest.list_visible_themes(10).await.unwrap().len(), 1);
        assert_eq!(author.list_visible_themes(10).await.unwrap().len(), 2);
        assert!(matches!(
            guest.create_theme(draft("Nada", true)).await,
            Err(ThemeServiceError::NotSignedIn)
        ));
        assert!(matches!(
            guest.list_my_themes(10).await,
            Err(ThemeServiceError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn invalid_drafts_are_rejected() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo, Arc::new(SignedInUser::new(UserId::generate())));
        let err = svc.create_theme(draft("   ", true)).await.unwrap_err();
        assert!(matches!(err, ThemeServiceError::Theme(_)));
    }
}
