#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod identity;
pub mod question_service;
pub mod quiz;
pub mod theme_service;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, HistoryServiceError, QuestionServiceError, QuizServiceError,
    ThemeServiceError,
};
pub use identity::{Anonymous, CurrentUser, SignedInUser};
pub use question_service::QuestionService;
pub use quiz::{
    AdvanceOutcome, PlayCommand, PlayEvent, QuizHandle, QuizHistoryService, QuizLoopService,
    QuizPlay, QuizRunner, RecordStatus, share_text,
};
pub use theme_service::{ThemeChange, ThemeChanges, ThemeService};
