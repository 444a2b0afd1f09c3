use std::sync::Arc;

use chrono::{DateTime, Utc};
use quiz_core::model::{OptionId, QuizSettings, ResultId, Theme, ThemeId};
use quiz_core::quiz::{QuizError, QuizEvent, QuizSession};
use rand::SeedableRng;
use rand::rngs::StdRng;
use storage::repository::{QuestionRepository, QuizResultRepository, StorageError, ThemeRepository};

use crate::Clock;
use crate::error::QuizServiceError;
use crate::identity::CurrentUser;

/// What happened to the result of a finished playthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    /// The quiz is still running, or was restarted.
    Pending,
    Recorded(ResultId),
    /// Nobody was signed in.
    NotRecorded,
    /// Persisting failed; `QuizLoopService::finalize_result` retries.
    Failed(String),
}

/// One playthrough: the theme, the engine and the RNG used for shuffles.
pub struct QuizPlay {
    theme: Theme,
    session: QuizSession,
    rng: StdRng,
    opening: QuizEvent,
    completed_at: Option<DateTime<Utc>>,
    record: RecordStatus,
}

impl QuizPlay {
    #[must_use]
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    /// The `QuestionShown` event for the first question of the current round.
    #[must_use]
    pub fn opening_event(&self) -> QuizEvent {
        self.opening
    }

    #[must_use]
    pub fn record_status(&self) -> &RecordStatus {
        &self.record
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

/// Result of an advance request.
#[derive(Debug)]
pub struct AdvanceOutcome {
    /// `None` when the advance was absorbed (question not answered yet).
    pub event: Option<QuizEvent>,
    /// Set when this advance completed the quiz for a signed-in user.
    pub recorded: Option<Result<ResultId, QuizServiceError>>,
}

impl AdvanceOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.event, Some(QuizEvent::Completed { .. }))
    }
}

/// Orchestrates fetching a theme's questions, playing them and recording the result.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    settings: QuizSettings,
    themes: Arc<dyn ThemeRepository>,
    questions: Arc<dyn QuestionRepository>,
    results: Arc<dyn QuizResultRepository>,
    user: Arc<dyn CurrentUser>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        themes: Arc<dyn ThemeRepository>,
        questions: Arc<dyn QuestionRepository>,
        results: Arc<dyn QuizResultRepository>,
        user: Arc<dyn CurrentUser>,
    ) -> Self {
        Self {
            clock,
            settings: QuizSettings::default(),
            themes,
            questions,
            results,
            user,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: QuizSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    /// Start playing a theme with an OS-seeded shuffle.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Unplayable` for a theme without questions and
    /// `QuizServiceError::Storage` if the theme is missing or fetching fails.
    pub async fn start_quiz(&self, theme_id: ThemeId) -> Result<QuizPlay, QuizServiceError> {
        self.start_quiz_with_rng(theme_id, StdRng::from_os_rng())
            .await
    }

    /// Start playing a theme, shuffling with the given RNG.
    ///
    /// # Errors
    ///
    /// See [`QuizLoopService::start_quiz`].
    pub async fn start_quiz_with_rng(
        &self,
        theme_id: ThemeId,
        mut rng: StdRng,
    ) -> Result<QuizPlay, QuizServiceError> {
        let theme = self
            .themes
            .get_theme(theme_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let questions = self.questions.list_questions(theme_id).await?;

        let mut session = QuizSession::new(theme_id, self.settings);
        let opening = match session.load(questions, &mut rng) {
            Ok(event) => event,
            Err(QuizError::UnplayableContent { theme_id }) => {
                tracing::info!(%theme_id, "theme has no questions to play");
                return Err(QuizServiceError::Unplayable { theme_id });
            }
            Err(err) => return Err(err.into()),
        };
        for malformed in session.malformed() {
            tracing::warn!(
                %theme_id,
                question_id = %malformed.question_id,
                correct_options = malformed.correct_count,
                "question does not have exactly one correct option"
            );
        }
        tracing::info!(%theme_id, total = session.total(), "quiz started");

        Ok(QuizPlay {
            theme,
            session,
            rng,
            opening,
            completed_at: None,
            record: RecordStatus::Pending,
        })
    }

    pub fn select_option(&self, play: &mut QuizPlay, option: OptionId) -> Option<QuizEvent> {
        let event = play.session.select_option(option);
        if event.is_none() {
            tracing::debug!(%option, "selection ignored");
        }
        event
    }

    pub fn tick(&self, play: &mut QuizPlay) -> Option<QuizEvent> {
        play.session.tick()
    }

    pub fn expire(&self, play: &mut QuizPlay) -> Option<QuizEvent> {
        let event = play.session.expire();
        if event.is_none() {
            tracing::debug!("expiry ignored for an answered question");
        }
        event
    }

    /// Replay the same questions in a new order. The previous record status is cleared.
    pub fn restart(&self, play: &mut QuizPlay) -> Option<QuizEvent> {
        let event = play.session.restart(&mut play.rng)?;
        play.opening = event;
        play.completed_at = None;
        play.record = RecordStatus::Pending;
        tracing::info!(theme_id = %play.theme.id(), "quiz restarted");
        Some(event)
    }

    /// Move to the next question, recording the result when the quiz completes.
    ///
    /// A recording failure is reported in the outcome; the session stays completed.
    pub async fn advance(&self, play: &mut QuizPlay) -> AdvanceOutcome {
        let event = play.session.advance();
        let Some(QuizEvent::Completed { score, total }) = event else {
            if event.is_none() {
                tracing::debug!("advance ignored before the question was answered");
            }
            return AdvanceOutcome {
                event,
                recorded: None,
            };
        };

        play.completed_at = Some(self.clock.now());
        tracing::info!(theme_id = %play.theme.id(), score, total, "quiz completed");
        let recorded = self.record(play).await;
        AdvanceOutcome { event, recorded }
    }

    /// Record the result of a completed quiz, unless already recorded.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotCompleted` before completion,
    /// `QuizServiceError::NotSignedIn` without a user and
    /// `QuizServiceError::Storage` if persistence fails again.
    pub async fn finalize_result(&self, play: &mut QuizPlay) -> Result<ResultId, QuizServiceError> {
        if let RecordStatus::Recorded(id) = play.record {
            return Ok(id);
        }
        if !play.session.is_completed() {
            return Err(QuizServiceError::NotCompleted);
        }
        match self.record(play).await {
            Some(recorded) => recorded,
            None => Err(QuizServiceError::NotSignedIn),
        }
    }

    async fn record(&self, play: &mut QuizPlay) -> Option<Result<ResultId, QuizServiceError>> {
        let Some(user) = self.user.current_user_id() else {
            tracing::info!(theme_id = %play.theme.id(), "no signed-in user; result not recorded");
            play.record = RecordStatus::NotRecorded;
            return None;
        };

        let completed_at = *play.completed_at.get_or_insert_with(|| self.clock.now());
        let result = match play.session.result(play.theme.title(), user, completed_at) {
            Ok(result) => result,
            Err(err) => return Some(Err(err.into())),
        };

        match self.results.append_result(&result).await {
            Ok(id) => {
                tracing::info!(result_id = %id, %user, "quiz result recorded");
                play.record = RecordStatus::Recorded(id);
                Some(Ok(id))
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to record quiz result");
                play.record = RecordStatus::Failed(err.to_string());
                Some(Err(err.into()))
            }
        }
    }
}
