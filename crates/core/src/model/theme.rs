use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{ThemeId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ThemeError {
    #[error("theme title cannot be empty")]
    EmptyTitle,

    #[error("theme description cannot be empty")]
    EmptyDescription,

    #[error("theme icon cannot be empty")]
    EmptyIcon,

    #[error("theme needs at least one color")]
    NoColors,
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// User-entered theme fields before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeDraft {
    pub title: String,
    pub description: String,
    pub icon: String,
    pub colors: Vec<String>,
    pub is_public: bool,
}

impl ThemeDraft {
    /// Trim and validate the draft.
    ///
    /// # Errors
    ///
    /// Returns `ThemeError` if title, description or icon are blank, or no
    /// color is given.
    pub fn validate(self) -> Result<ValidatedTheme, ThemeError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(ThemeError::EmptyTitle);
        }
        let description = self.description.trim().to_owned();
        if description.is_empty() {
            return Err(ThemeError::EmptyDescription);
        }
        let icon = self.icon.trim().to_owned();
        if icon.is_empty() {
            return Err(ThemeError::EmptyIcon);
        }
        let colors: Vec<String> = self
            .colors
            .into_iter()
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty())
            .collect();
        if colors.is_empty() {
            return Err(ThemeError::NoColors);
        }

        Ok(ValidatedTheme {
            title,
            description,
            icon,
            colors,
            is_public: self.is_public,
        })
    }
}

/// Theme fields that passed validation but have no identity yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTheme {
    pub title: String,
    pub description: String,
    pub icon: String,
    pub colors: Vec<String>,
    pub is_public: bool,
}

//
// ─── THEME ─────────────────────────────────────────────────────────────────────
//

/// A quiz category authored by a user.
///
/// `questions_count` is a denormalized counter kept by the store; it may lag
/// behind the real number of questions if a counter update failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    id: ThemeId,
    title: String,
    description: String,
    icon: String,
    colors: Vec<String>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    questions_count: u32,
    is_public: bool,
}

impl Theme {
    /// Build a brand-new theme with a zero question count.
    #[must_use]
    pub fn new(
        id: ThemeId,
        fields: ValidatedTheme,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: fields.title,
            description: fields.description,
            icon: fields.icon,
            colors: fields.colors,
            created_by,
            created_at,
            questions_count: 0,
            is_public: fields.is_public,
        }
    }

    /// Rehydrate a theme from storage.
    ///
    /// # Errors
    ///
    /// Returns `ThemeError` if the stored fields no longer validate.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: ThemeId,
        title: String,
        description: String,
        icon: String,
        colors: Vec<String>,
        created_by: UserId,
        created_at: DateTime<Utc>,
        questions_count: u32,
        is_public: bool,
    ) -> Result<Self, ThemeError> {
        let fields = ThemeDraft {
            title,
            description,
            icon,
            colors,
            is_public,
        }
        .validate()?;
        let mut theme = Self::new(id, fields, created_by, created_at);
        theme.questions_count = questions_count;
        Ok(theme)
    }

    /// Replace the editable fields, keeping identity, owner and counter.
    pub fn apply_edit(&mut self, fields: ValidatedTheme) {
        self.title = fields.title;
        self.description = fields.description;
        self.icon = fields.icon;
        self.colors = fields.colors;
        self.is_public = fields.is_public;
    }

    #[must_use]
    pub fn id(&self) -> ThemeId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn icon(&self) -> &str {
        &self.icon
    }

    #[must_use]
    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    /// Primary color used when a single swatch is rendered.
    #[must_use]
    pub fn display_color(&self) -> &str {
        self.colors.first().map_or("", String::as_str)
    }

    #[must_use]
    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn questions_count(&self) -> u32 {
        self.questions_count
    }

    pub fn set_questions_count(&mut self, count: u32) {
        self.questions_count = count;
    }

    #[must_use]
    pub fn is_public(&self) -> bool {
        self.is_public
    }

    /// A theme is visible to its owner and, when public, to everyone.
    #[must_use]
    pub fn is_visible_to(&self, user: Option<UserId>) -> bool {
        self.is_public || user == Some(self.created_by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft() -> ThemeDraft {
        ThemeDraft {
            title: "  Historia del Perú ".into(),
            description: " Incas, virreinato y república ".into(),
            icon: "landmark".into(),
            colors: vec!["#0F3057".into(), " #008891 ".into()],
            is_public: true,
        }
    }

    #[test]
    fn validate_trims_fields() {
        let fields = draft().validate().unwrap();
        assert_eq!(fields.title, "Historia del Perú");
        assert_eq!(fields.description, "Incas, virreinato y república");
        assert_eq!(fields.colors, vec!["#0F3057", "#008891"]);
    }

    #[test]
    fn validate_rejects_blank_title_and_description() {
        let mut d = draft();
        d.title = "   ".into();
        assert_eq!(d.validate().unwrap_err(), ThemeError::EmptyTitle);

        let mut d = draft();
        d.description = String::new();
        assert_eq!(d.validate().unwrap_err(), ThemeError::EmptyDescription);
    }

    #[test]
    fn validate_requires_a_color() {
        let mut d = draft();
        d.colors = vec!["  ".into()];
        assert_eq!(d.validate().unwrap_err(), ThemeError::NoColors);
    }

    #[test]
    fn new_theme_starts_with_zero_questions() {
        let owner = UserId::generate();
        let theme = Theme::new(ThemeId::new(1), draft().validate().unwrap(), owner, fixed_now());
        assert_eq!(theme.questions_count(), 0);
        assert_eq!(theme.display_color(), "#0F3057");
        assert_eq!(theme.created_by(), owner);
    }

    #[test]
    fn visibility_follows_public_flag_and_owner() {
        let owner = UserId::generate();
        let mut d = draft();
        d.is_public = false;
        let theme = Theme::new(ThemeId::new(1), d.validate().unwrap(), owner, fixed_now());

        assert!(theme.is_visible_to(Some(owner)));
        assert!(!theme.is_visible_to(Some(UserId::generate())));
        assert!(!theme.is_visible_to(None));
    }

    #[test]
    fn apply_edit_keeps_identity_and_counter() {
        let owner = UserId::generate();
        let mut theme =
            Theme::new(ThemeId::new(9), draft().validate().unwrap(), owner, fixed_now());
        theme.set_questions_count(4);

        let mut d = draft();
        d.title = "Geografía".into();
        d.is_public = false;
        theme.apply_edit(d.validate().unwrap());

        assert_eq!(theme.id(), ThemeId::new(9));
        assert_eq!(theme.title(), "Geografía");
        assert_eq!(theme.questions_count(), 4);
        assert!(!theme.is_public());
    }
}
