//! # Core metrics trait, the no-op default, and the event-name table.
//!
//! ## Contract
//! - Implementations are **side-effect-only**: nothing they return or do may
//!   influence control flow in the caller.
//! - Implementations must not panic out of the caller; keep `incr`/`record`
//!   cheap and infallible (buffer internally, drop on overflow).
//! - Event names are the `names` constants below; both halves of the runtime
//!   and the tests agree on them.

use std::sync::Arc;
use std::time::Duration;

/// Event names emitted by the scheduler and the HTTP client.
///
/// Counter events fire once per occurrence; `*.duration` names are duration
/// recordings made at terminal outcomes.
pub mod names {
    /// Task acquired an admission slot.
    pub const TASK_ADMITTED: &str = "task.admitted";
    /// Task body began executing.
    pub const TASK_STARTED: &str = "task.started";
    /// Task reached a suspension point and yielded.
    pub const TASK_SUSPENDED: &str = "task.suspended";
    /// Task resumed after a suspension.
    pub const TASK_RESUMED: &str = "task.resumed";
    /// Task finished with a value.
    pub const TASK_COMPLETED: &str = "task.completed";
    /// Task finished with a captured error.
    pub const TASK_FAILED: &str = "task.failed";
    /// Task finished via cooperative cancellation.
    pub const TASK_CANCELLED: &str = "task.cancelled";
    /// Task exceeded its execution budget.
    pub const TASK_TIMED_OUT: &str = "task.timed_out";
    /// Wall time from admission to terminal state.
    pub const TASK_DURATION: &str = "task.duration";

    /// Transfer attempt handed to the multiplexer.
    pub const HTTP_ATTEMPT: &str = "http.attempt";
    /// Re-attempt scheduled after a retryable outcome.
    pub const HTTP_RETRY: &str = "http.retry";
    /// Request resolved with a deliverable response.
    pub const HTTP_SUCCESS: &str = "http.success";
    /// Request resolved with a terminal status error.
    pub const HTTP_STATUS_ERROR: &str = "http.status_error";
    /// Request resolved with a terminal transport error.
    pub const HTTP_TRANSPORT_ERROR: &str = "http.transport_error";
    /// Request rejected before admission (malformed descriptor).
    pub const HTTP_REJECTED: &str = "http.rejected";
    /// Wall time from submission to terminal outcome.
    pub const HTTP_DURATION: &str = "http.duration";
}

/// Instrumentation seam for counters and durations.
///
/// Injected as an [`Arc`] into the scheduler and the HTTP client at
/// construction; the core never constructs or discovers telemetry itself.
pub trait Metrics: Send + Sync + 'static {
    /// Increments the counter for `name` by one.
    fn incr(&self, name: &str);

    /// Records one observed duration for `name`.
    fn record(&self, name: &str, elapsed: Duration);
}

/// Shared handle to a metrics implementation.
pub type MetricsRef = Arc<dyn Metrics>;

/// Discards every observation; the default when no telemetry is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn incr(&self, _name: &str) {}

    fn record(&self, _name: &str, _elapsed: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_accepts_everything() {
        let m = NoopMetrics;
        m.incr(names::TASK_ADMITTED);
        m.record(names::TASK_DURATION, Duration::from_millis(5));
    }

    #[test]
    fn test_usable_as_trait_object() {
        let m: MetricsRef = Arc::new(NoopMetrics);
        m.incr(names::HTTP_ATTEMPT);
        m.record(names::HTTP_DURATION, Duration::ZERO);
    }
}
