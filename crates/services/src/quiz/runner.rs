//! Timed driver for one playthrough.
//!
//! The runner owns the `QuizPlay` inside a spawned task. Commands arrive on
//! one channel, countdown ticks on a tokio interval; `select!` handles one of
//! them at a time, so transitions never interleave. Events go out on a
//! second channel in the order they happened.

use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{OptionId, ResultId};
use quiz_core::quiz::QuizEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::countdown::Countdown;
use super::workflow::{QuizLoopService, QuizPlay};
use crate::error::QuizServiceError;

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayCommand {
    Select(OptionId),
    Advance,
    Restart,
    RetryRecord,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayEvent {
    Quiz(QuizEvent),
    Recorded(ResultId),
    RecordFailed(String),
    NotRecorded,
}

/// Spawns timed playthroughs.
#[derive(Clone)]
pub struct QuizRunner {
    service: Arc<QuizLoopService>,
    time_unit: Duration,
}

impl QuizRunner {
    /// One countdown unit per second.
    #[must_use]
    pub fn new(service: Arc<QuizLoopService>) -> Self {
        Self {
            service,
            time_unit: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_time_unit(mut self, time_unit: Duration) -> Self {
        self.time_unit = time_unit;
        self
    }

    /// Start driving `play`. The first event is the opening `QuestionShown`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(&self, play: QuizPlay) -> QuizHandle {
        let (commands, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, events) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(drive(
            Arc::clone(&self.service),
            play,
            self.time_unit,
            command_rx,
            event_tx,
        ));
        QuizHandle {
            commands,
            events,
            task,
        }
    }
}

/// Control side of a running playthrough. Dropping it stops the task.
pub struct QuizHandle {
    commands: mpsc::Sender<PlayCommand>,
    events: mpsc::Receiver<PlayEvent>,
    task: JoinHandle<QuizPlay>,
}

impl QuizHandle {
    /// # Errors
    ///
    /// Returns `QuizServiceError::RunnerStopped` once the task has exited.
    pub async fn send(&self, command: PlayCommand) -> Result<(), QuizServiceError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| QuizServiceError::RunnerStopped)
    }

    /// A sender for feeding commands from elsewhere, e.g. an input thread.
    #[must_use]
    pub fn commands(&self) -> mpsc::Sender<PlayCommand> {
        self.commands.clone()
    }

    /// Next event, or `None` after the task stopped and the queue drained.
    pub async fn next_event(&mut self) -> Option<PlayEvent> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<PlayEvent> {
        self.events.try_recv().ok()
    }

    /// Stop the task and take the playthrough back.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::RunnerStopped` if the task panicked or was aborted.
    pub async fn finish(self) -> Result<QuizPlay, QuizServiceError> {
        let Self {
            commands,
            events,
            task,
        } = self;
        drop(events);
        let _ = commands.send(PlayCommand::Exit).await;
        drop(commands);
        task.await.map_err(|_| QuizServiceError::RunnerStopped)
    }
}

async fn drive(
    service: Arc<QuizLoopService>,
    mut play: QuizPlay,
    time_unit: Duration,
    mut commands: mpsc::Receiver<PlayCommand>,
    events: mpsc::Sender<PlayEvent>,
) -> QuizPlay {
    let mut countdown = Countdown::new(time_unit);
    if events
        .send(PlayEvent::Quiz(play.opening_event()))
        .await
        .is_err()
    {
        return play;
    }

    loop {
        let emitted = tokio::select! {
            command = commands.recv() => match command {
                Some(PlayCommand::Exit) | None => break,
                Some(command) => apply(&service, &mut play, command).await,
            },
            () = countdown.tick(), if play.session().is_timing() => {
                quiz_events(service.tick(&mut play))
            }
        };

        for event in emitted {
            if matches!(event, PlayEvent::Quiz(QuizEvent::QuestionShown { .. })) {
                countdown.restart();
            }
            if events.send(event).await.is_err() {
                tracing::debug!("event receiver dropped; stopping quiz runner");
                return play;
            }
        }
    }

    tracing::debug!(theme_id = %play.theme().id(), "quiz runner stopped");
    play
}

async fn apply(
    service: &QuizLoopService,
    play: &mut QuizPlay,
    command: PlayCommand,
) -> Vec<PlayEvent> {
    match command {
        PlayCommand::Select(option) => quiz_events(service.select_option(play, option)),
        PlayCommand::Advance => {
            let outcome = service.advance(play).await;
            let complete = outcome.is_complete();
            let mut emitted = quiz_events(outcome.event);
            if complete {
                emitted.push(record_event(outcome.recorded));
            }
            emitted
        }
        PlayCommand::Restart => quiz_events(service.restart(play)),
        PlayCommand::RetryRecord => {
            if !play.session().is_completed() {
                tracing::debug!("retry ignored; quiz still running");
                return Vec::new();
            }
            let event = match service.finalize_result(play).await {
                Ok(id) => PlayEvent::Recorded(id),
                Err(QuizServiceError::NotSignedIn) => PlayEvent::NotRecorded,
                Err(err) => PlayEvent::RecordFailed(err.to_string()),
            };
            vec![event]
        }
        PlayCommand::Exit => Vec::new(),
    }
}

fn quiz_events(event: Option<QuizEvent>) -> Vec<PlayEvent> {
    event.map(PlayEvent::Quiz).into_iter().collect()
}

fn record_event(recorded: Option<Result<ResultId, QuizServiceError>>) -> PlayEvent {
    match recorded {
        Some(Ok(id)) => PlayEvent::Recorded(id),
        Some(Err(err)) => PlayEvent::RecordFailed(err.to_string()),
        None => PlayEvent::NotRecorded,
    }
}
