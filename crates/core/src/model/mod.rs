mod ids;
mod question;
mod result;
mod settings;
mod theme;

pub use ids::{OptionId, ParseIdError, QuestionId, ResultId, ThemeId, UserId};

pub use question::{
    AnswerOption, MalformedQuestion, Question, QuestionDraft, QuestionError, ValidatedQuestion,
};
pub use result::{QuizResult, QuizResultError, UserStats, percentage};
pub use settings::{QuizSettings, ResultTier, SettingsError, TierThresholds};
pub use theme::{Theme, ThemeDraft, ThemeError, ValidatedTheme};
