//! Staged concurrency ramp.
use rampart_core::Stage;
use std::time::Duration;

/// Converts an ordered stage list into a target concurrency at any point of the run.
///
/// The ramp starts at zero virtual users and moves linearly from one stage boundary target to
/// the next. A zero-duration stage is an instantaneous jump to its target. At a boundary the
/// result is exactly the target of the stage ending there (the last one, when several
/// zero-duration stages share the timestamp). Once the last stage has ended the result is zero.
#[derive(Clone, Debug)]
pub struct RampScheduler {
    stages: Vec<Stage>,
    total: Duration,
}

impl RampScheduler {
    pub fn new(stages: Vec<Stage>) -> Self {
        let total = stages.iter().map(|s| s.duration).sum();
        Self { stages, total }
    }

    pub fn total_duration(&self) -> Duration {
        self.total
    }

    pub fn tick(&self, elapsed: Duration) -> usize {
        let mut start = Duration::ZERO;
        let mut from = 0usize;

        for stage in &self.stages {
            let end = start + stage.duration;
            if elapsed < end {
                let progress = (elapsed - start).as_secs_f64() / stage.duration.as_secs_f64();
                let delta = stage.target as f64 - from as f64;
                return (from as f64 + delta * progress).round() as usize;
            }
            from = stage.target;
            start = end;
        }

        match self.stages.last() {
            Some(last) if elapsed == self.total => last.target,
            _ => 0,
        }
    }
}
