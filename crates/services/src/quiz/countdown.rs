use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Per-question countdown: one tick per time unit, restarted at every
/// question boundary.
pub(crate) struct Countdown {
    interval: Interval,
}

impl Countdown {
    /// The first tick fires one full `period` from now.
    pub(crate) fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// Drop any pending tick and start counting from now.
    pub(crate) fn restart(&mut self) {
        self.interval.reset();
    }

    /// Cancel safe; a dropped call does not consume a tick.
    pub(crate) async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
