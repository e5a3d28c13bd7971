//! Checkpoint timing for long-running steps.
//!
//! A [`Stopwatch`] logs the time since the previous checkpoint and since it
//! was started, so a load → precompute → trial run reads as a timeline in the
//! log output.

use std::time::{Duration, Instant};

/// Named stopwatch that reports checkpoints through `tracing`.
#[derive(Debug)]
pub struct Stopwatch {
    name: String,
    started: Instant,
    last: Instant,
}

impl Stopwatch {
    /// Start timing.
    pub fn start(name: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            name: name.into(),
            started: now,
            last: now,
        }
    }

    /// Log the time spent since the previous checkpoint and return it.
    pub fn checkpoint(&mut self, step: &str) -> Duration {
        let now = Instant::now();
        let step_time = now - self.last;
        self.last = now;
        tracing::info!(
            timer = %self.name,
            step,
            step_ms = step_time.as_millis() as u64,
            total_ms = (now - self.started).as_millis() as u64,
            "checkpoint"
        );
        step_time
    }

    /// Log the total elapsed time and consume the stopwatch.
    pub fn finish(self) -> Duration {
        let total = self.started.elapsed();
        tracing::info!(
            timer = %self.name,
            total_ms = total.as_millis() as u64,
            "finished"
        );
        total
    }
}
