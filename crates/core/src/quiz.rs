//! Quiz session engine.
//!
//! A [`QuizSession`] drives one playthrough of a theme: it owns its own copy
//! of the questions, shows them one at a time with a per-question countdown,
//! scores the first answer given to each question and ends in a terminal
//! `Completed` state.
//!
//! Every input returns `Option<QuizEvent>`. `None` means a guard absorbed the
//! input (double submit, timer firing after an answer, advancing before
//! answering, input after completion); the state is unchanged in that case.

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;

use crate::model::{
    MalformedQuestion, OptionId, Question, QuizResult, QuizResultError, QuizSettings, ResultTier,
    ThemeId, UserId, percentage,
};
use crate::shuffle::uniform_shuffle;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("theme {theme_id} has no playable questions")]
    UnplayableContent { theme_id: ThemeId },

    #[error("questions are already loaded for this session")]
    AlreadyLoaded,

    #[error("quiz is not completed yet")]
    NotCompleted,

    #[error(transparent)]
    Result(#[from] QuizResultError),
}

/// The question currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveQuestion {
    pub index: usize,
    pub selected: Option<OptionId>,
    pub answered: bool,
    pub time_remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    Loading,
    Active(ActiveQuestion),
    Completed { score: u32, total: u32 },
}

/// State change notifications for whoever renders the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizEvent {
    QuestionShown {
        index: usize,
        total: u32,
        time_remaining: u32,
    },
    Tick {
        index: usize,
        remaining: u32,
    },
    Answered {
        index: usize,
        option: OptionId,
        correct: bool,
    },
    TimedOut {
        index: usize,
    },
    Completed {
        score: u32,
        total: u32,
    },
}

pub struct QuizSession {
    theme_id: ThemeId,
    settings: QuizSettings,
    questions: Vec<Question>,
    state: QuizState,
    score: u32,
    malformed: Vec<MalformedQuestion>,
}

impl QuizSession {
    /// A session waiting for its questions.
    #[must_use]
    pub fn new(theme_id: ThemeId, settings: QuizSettings) -> Self {
        Self {
            theme_id,
            settings,
            questions: Vec::new(),
            state: QuizState::Loading,
            score: 0,
            malformed: Vec::new(),
        }
    }

    /// Shortcut for `new` followed by `load`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::UnplayableContent` if `questions` is empty.
    pub fn start<R: Rng + ?Sized>(
        theme_id: ThemeId,
        settings: QuizSettings,
        questions: Vec<Question>,
        rng: &mut R,
    ) -> Result<Self, QuizError> {
        let mut session = Self::new(theme_id, settings);
        session.load(questions, rng)?;
        Ok(session)
    }

    /// Shuffle the loaded questions and show the first one.
    ///
    /// Malformed questions (zero or several correct options) are kept and
    /// reported through [`QuizSession::malformed`].
    ///
    /// # Errors
    ///
    /// Returns `QuizError::UnplayableContent` for an empty set (the session
    /// stays `Loading`) and `QuizError::AlreadyLoaded` if called twice.
    pub fn load<R: Rng + ?Sized>(
        &mut self,
        mut questions: Vec<Question>,
        rng: &mut R,
    ) -> Result<QuizEvent, QuizError> {
        if self.state != QuizState::Loading {
            return Err(QuizError::AlreadyLoaded);
        }
        if questions.is_empty() {
            return Err(QuizError::UnplayableContent {
                theme_id: self.theme_id,
            });
        }

        self.malformed = questions
            .iter()
            .filter_map(|q| q.check_integrity().err())
            .collect();
        uniform_shuffle(&mut questions, rng);
        self.questions = questions;
        Ok(self.show(0))
    }

    fn show(&mut self, index: usize) -> QuizEvent {
        let time_remaining = self.settings.question_time_secs();
        self.state = QuizState::Active(ActiveQuestion {
            index,
            selected: None,
            answered: false,
            time_remaining,
        });
        QuizEvent::QuestionShown {
            index,
            total: self.total(),
            time_remaining,
        }
    }

    fn pending(&self) -> Option<ActiveQuestion> {
        match self.state {
            QuizState::Active(active) if !active.answered => Some(active),
            _ => None,
        }
    }

    /// Record the user's pick for the current question.
    ///
    /// Ignored once the question is answered or timed out, and for ids that
    /// are not options of the current question.
    pub fn select_option(&mut self, option: OptionId) -> Option<QuizEvent> {
        let active = self.pending()?;
        let question = &self.questions[active.index];
        question.option(option)?;
        let correct = question.is_correct_answer(option);
        if correct {
            self.score += 1;
        }
        self.state = QuizState::Active(ActiveQuestion {
            selected: Some(option),
            answered: true,
            ..active
        });
        Some(QuizEvent::Answered {
            index: active.index,
            option,
            correct,
        })
    }

    /// One unit of the countdown. Reaching zero times the question out.
    pub fn tick(&mut self) -> Option<QuizEvent> {
        let active = self.pending()?;
        let remaining = active.time_remaining.saturating_sub(1);
        if remaining == 0 {
            return self.expire();
        }
        self.state = QuizState::Active(ActiveQuestion {
            time_remaining: remaining,
            ..active
        });
        Some(QuizEvent::Tick {
            index: active.index,
            remaining,
        })
    }

    /// Time ran out for the current question: answered, nothing selected, no score.
    pub fn expire(&mut self) -> Option<QuizEvent> {
        let active = self.pending()?;
        self.state = QuizState::Active(ActiveQuestion {
            index: active.index,
            selected: None,
            answered: true,
            time_remaining: 0,
        });
        Some(QuizEvent::TimedOut {
            index: active.index,
        })
    }

    /// Move past an answered question, completing the quiz after the last one.
    pub fn advance(&mut self) -> Option<QuizEvent> {
        let QuizState::Active(active) = self.state else {
            return None;
        };
        if !active.answered {
            return None;
        }
        let next = active.index + 1;
        if next < self.questions.len() {
            return Some(self.show(next));
        }
        let total = self.total();
        self.state = QuizState::Completed {
            score: self.score,
            total,
        };
        Some(QuizEvent::Completed {
            score: self.score,
            total,
        })
    }

    /// Play the same questions again in a fresh order with a zeroed score.
    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<QuizEvent> {
        if !self.is_completed() {
            return None;
        }
        self.score = 0;
        uniform_shuffle(&mut self.questions, rng);
        Some(self.show(0))
    }

    #[must_use]
    pub fn theme_id(&self) -> ThemeId {
        self.theme_id
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn state(&self) -> QuizState {
        self.state
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        u32::try_from(self.questions.len()).unwrap_or(u32::MAX)
    }

    /// Questions in play order.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            QuizState::Active(active) => self.questions.get(active.index),
            _ => None,
        }
    }

    #[must_use]
    pub fn malformed(&self) -> &[MalformedQuestion] {
        &self.malformed
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.state, QuizState::Completed { .. })
    }

    /// True while the current question is waiting for an answer, i.e. while
    /// a countdown should be running.
    #[must_use]
    pub fn is_timing(&self) -> bool {
        self.pending().is_some()
    }

    /// Final percentage, once completed.
    #[must_use]
    pub fn percentage(&self) -> Option<u32> {
        match self.state {
            QuizState::Completed { score, total } => Some(percentage(score, total)),
            _ => None,
        }
    }

    #[must_use]
    pub fn tier(&self) -> Option<ResultTier> {
        self.percentage().map(|p| self.settings.tiers().tier(p))
    }

    /// Build the summary handed to the result recorder.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotCompleted` before the last question was advanced past.
    pub fn result(
        &self,
        theme_name: &str,
        user_id: UserId,
        completed_at: DateTime<Utc>,
    ) -> Result<QuizResult, QuizError> {
        let QuizState::Completed { score, total } = self.state else {
            return Err(QuizError::NotCompleted);
        };
        Ok(QuizResult::new(
            self.theme_id,
            theme_name,
            user_id,
            score,
            total,
            completed_at,
        )?)
    }
}
