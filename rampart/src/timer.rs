use std::time::Duration;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

/// Fixed-interval clock driving the ramp.
pub(crate) struct Timer {
    interval: Interval,
    started: Instant,
    interval_dur: Duration,
}

impl Timer {
    pub fn new(interval_dur: Duration) -> Self {
        let mut interval = interval(interval_dur);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            started: Instant::now(),
            interval_dur,
        }
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Waits for the next tick and returns the time elapsed since the timer was created.
    ///
    /// NOTE: The first tick completes immediately.
    pub async fn tick(&mut self) -> Duration {
        self.interval.tick().await;
        self.started.elapsed()
    }
}

impl std::fmt::Display for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", humantime::format_duration(self.interval_dur))
    }
}
