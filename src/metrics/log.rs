//! # Tracing-backed metrics recorder _(demo/reference only)_.

use std::time::Duration;

use super::recorder::Metrics;

/// Forwards every counter and duration to `tracing` at debug level.
///
/// Useful during development or in deployments that ship logs but no
/// metrics pipeline. Event volume is one log line per observation; point a
/// real backend at the [`Metrics`] port for anything hot.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMetrics;

impl LogMetrics {
    /// Creates a new tracing-backed recorder.
    pub fn new() -> Self {
        Self
    }
}

impl Metrics for LogMetrics {
    fn incr(&self, name: &str) {
        tracing::debug!(target: "taskweave::metrics", counter = name, "incr");
    }

    fn record(&self, name: &str, elapsed: Duration) {
        tracing::debug!(
            target: "taskweave::metrics",
            timer = name,
            elapsed_ms = elapsed.as_millis() as u64,
            "record"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::names;

    #[test]
    fn test_log_metrics_is_infallible() {
        let m = LogMetrics::new();
        m.incr(names::TASK_STARTED);
        m.record(names::TASK_DURATION, Duration::from_secs(1));
    }
}
