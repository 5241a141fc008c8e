//! Timing utilities for long-running stages.
//!
//! Encoder invocations are blocking and can take minutes, so every stage
//! that shells out is wrapped in a [`StageTimer`] that reports its duration
//! through `tracing`.

use std::time::{Duration, Instant};

/// Measures one named stage and logs its duration when finished.
///
/// A timer dropped without [`StageTimer::finish`] (for example when the
/// stage returned early with an error) logs at `warn` instead.
#[derive(Debug)]
pub struct StageTimer {
    label: String,
    started: Instant,
    finished: bool,
}

impl StageTimer {
    /// Start timing a stage now.
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        tracing::debug!(stage = %label, "Stage started");
        Self {
            label,
            started: Instant::now(),
            finished: false,
        }
    }

    /// Stage label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Time elapsed since the stage started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Seconds elapsed since the stage started.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// Mark the stage complete, log it, and return the elapsed seconds.
    pub fn finish(mut self) -> f64 {
        self.finished = true;
        let secs = self.elapsed_secs();
        tracing::info!(stage = %self.label, elapsed_secs = secs, "Stage done");
        secs
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                stage = %self.label,
                elapsed_secs = self.elapsed_secs(),
                "Stage ended without completing"
            );
        }
    }
}

/// Format seconds the way progress lines show them (`12.34s`).
pub fn format_secs(secs: f64) -> String {
    format!("{secs:.2}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_elapsed_is_small() {
        let timer = StageTimer::start("noop");
        assert!(timer.elapsed() < Duration::from_secs(1));
        assert_eq!(timer.label(), "noop");
    }

    #[test]
    fn test_finish_returns_elapsed() {
        let timer = StageTimer::start("sleep");
        std::thread::sleep(Duration::from_millis(5));
        let secs = timer.finish();
        assert!(secs >= 0.005);
    }

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(1.5), "1.50s");
        assert_eq!(format_secs(0.0), "0.00s");
    }
}
