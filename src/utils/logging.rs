use log::{log_enabled, warn, Level};
use std::time::{Duration, Instant};

/// Simple scoped timer for tracing critical sections.
pub struct ScopedTimer<'a> {
    label: &'a str,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("start {label}");
        }
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        if log_enabled!(Level::Trace) {
            let elapsed = self.start.elapsed();
            log::trace!("end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Emits a warning when a collision step ran longer than its budget.
pub fn warn_if_frame_budget_exceeded(duration: Duration, budget_ms: f32) -> bool {
    let elapsed_ms = duration.as_secs_f32() * 1000.0;
    if elapsed_ms > budget_ms {
        warn!(
            "collision step exceeded budget: {:.2} ms > {:.2} ms",
            elapsed_ms, budget_ms
        );
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_check_reports_overruns() {
        assert!(warn_if_frame_budget_exceeded(Duration::from_millis(20), 16.0));
        assert!(!warn_if_frame_budget_exceeded(Duration::from_millis(2), 16.0));
    }
}
