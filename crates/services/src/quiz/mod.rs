mod countdown;
mod history;
mod runner;
mod share;
mod workflow;

// Public API of the quiz subsystem.
pub use crate::error::QuizServiceError;
pub use history::QuizHistoryService;
pub use runner::{PlayCommand, PlayEvent, QuizHandle, QuizRunner};
pub use share::share_text;
pub use workflow::{AdvanceOutcome, QuizLoopService, QuizPlay, RecordStatus};
