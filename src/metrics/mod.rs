//! # Metrics port: counters and durations behind a narrow seam.
//!
//! The scheduler and the HTTP client report what happened through
//! [`Metrics`], injected at construction. The port is intentionally tiny
//! (increment-style counters and duration recordings keyed by event name)
//! so any telemetry backend can sit behind it without the core depending on
//! one. [`NoopMetrics`] is the default; [`LogMetrics`] forwards everything
//! to `tracing` for setups that want visibility without a metrics pipeline.

mod log;
mod recorder;

pub use log::LogMetrics;
pub use recorder::{names, Metrics, MetricsRef, NoopMetrics};
