//! # Runtime configuration.
//!
//! [`Config`] bundles the two flat sections the surrounding application
//! injects at construction time: [`SchedulerConfig`] for the cooperative
//! scheduler and [`HttpConfig`] for the HTTP client. Fields keep the units
//! of the external configuration surface (`*_seconds` as floats, `0` meaning
//! unbounded); the `Duration`/`Option` views are derived through accessors.
//!
//! Values are read once at construction; neither the scheduler nor the
//! client exposes runtime mutation.
//!
//! # Example
//! ```
//! use taskweave::Config;
//!
//! let mut cfg = Config::default();
//! cfg.scheduler.max_concurrent_tasks = 4;
//! cfg.http.max_retries = 2;
//!
//! assert_eq!(cfg.scheduler.admission_bound(), Some(4));
//! assert!(cfg.scheduler.execution_budget().is_none()); // 0.0 = unbounded
//! assert!(cfg.http.is_retryable_status(503));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Smallest poll interval the dispatcher will accept.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Combined configuration for both halves of the runtime.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduler section (`async.scheduler.*`).
    pub scheduler: SchedulerConfig,
    /// HTTP client section (`async.http.*`).
    pub http: HttpConfig,
}

/// Configuration for the cooperative task scheduler.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of tasks past admission at any instant (0 = unbounded).
    pub max_concurrent_tasks: usize,
    /// Per-task wall-clock budget in seconds, measured from the moment the
    /// task leaves `Pending` (0 = unbounded).
    pub max_task_execution_seconds: f64,
}

impl Default for SchedulerConfig {
    /// Defaults: no admission bound, no execution budget.
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 0,
            max_task_execution_seconds: 0.0,
        }
    }
}

impl SchedulerConfig {
    /// Admission bound as an option; `0` is treated as "no bound".
    pub fn admission_bound(&self) -> Option<usize> {
        match self.max_concurrent_tasks {
            0 => None,
            n => Some(n),
        }
    }

    /// Execution budget as a duration; `0` (or negative) is treated as "no budget".
    pub fn execution_budget(&self) -> Option<Duration> {
        if self.max_task_execution_seconds > 0.0 {
            Some(Duration::from_secs_f64(self.max_task_execution_seconds))
        } else {
            None
        }
    }
}

/// Configuration for the HTTP client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Longest the dispatcher blocks waiting for socket activity, in seconds.
    ///
    /// Controls latency-to-detect-completion, not correctness: a smaller
    /// value trades CPU wake-ups for lower tail latency.
    pub poll_interval_seconds: f64,
    /// Additional attempts after the first (0 = exactly one attempt).
    pub max_retries: u32,
    /// Fixed delay before a re-attempt, in seconds.
    pub retry_delay_seconds: f64,
    /// HTTP statuses eligible for retry.
    pub retry_on_status: Vec<u16>,
    /// Maximum number of simultaneously in-flight transfers (0 = unbounded).
    ///
    /// Tracked independently of the scheduler's admission bound; a transfer
    /// waiting out its retry delay does not hold a slot.
    pub max_concurrent: usize,
}

impl Default for HttpConfig {
    /// Defaults: 10ms poll interval, no retries, no retry delay,
    /// retry on `429/500/502/503/504`, unbounded in-flight set.
    fn default() -> Self {
        Self {
            poll_interval_seconds: 0.01,
            max_retries: 0,
            retry_delay_seconds: 0.0,
            retry_on_status: vec![429, 500, 502, 503, 504],
            max_concurrent: 0,
        }
    }
}

impl HttpConfig {
    /// Poll interval as a duration, clamped to a 1ms floor.
    pub fn poll_interval(&self) -> Duration {
        if self.poll_interval_seconds > 0.0 {
            Duration::from_secs_f64(self.poll_interval_seconds).max(MIN_POLL_INTERVAL)
        } else {
            MIN_POLL_INTERVAL
        }
    }

    /// Retry delay as a duration; non-positive values collapse to zero.
    pub fn retry_delay(&self) -> Duration {
        if self.retry_delay_seconds > 0.0 {
            Duration::from_secs_f64(self.retry_delay_seconds)
        } else {
            Duration::ZERO
        }
    }

    /// In-flight bound as an option; `0` is treated as "no bound".
    pub fn max_inflight(&self) -> Option<usize> {
        match self.max_concurrent {
            0 => None,
            n => Some(n),
        }
    }

    /// True if `status` is configured as retry-eligible.
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    /// Total attempt budget: the first attempt plus `max_retries`.
    pub fn attempt_budget(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}
