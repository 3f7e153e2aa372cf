//! Error types used by the scheduler and the HTTP client.
//!
//! This module defines three error enums:
//!
//! - [`TaskError`] — terminal outcomes of individual task executions.
//! - [`HttpError`] — terminal outcomes of HTTP requests.
//! - [`SchedulerError`] — errors raised by the scheduler runtime itself.
//!
//! All types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics. Errors are always resolved onto the owning task handle
//! or request future — one task/request failing never aborts a sibling or
//! the drive loop that carried it.

use std::time::Duration;

use thiserror::Error;

use crate::http::Response;
use crate::scheduler::TaskId;

/// # Errors produced by task execution.
///
/// Exactly one of these is captured on a task's result slot when it reaches
/// a terminal state other than `Completed`. Task bodies return
/// [`TaskError::Canceled`] from suspension points to propagate cooperative
/// cancellation with `?`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Task body returned an error (or panicked); captured, never rethrown.
    #[error("execution failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// Task exceeded its wall-clock execution budget.
    #[error("timed out after {budget:?}")]
    TimedOut {
        /// The budget that was exceeded.
        budget: Duration,
    },

    /// Cooperative cancellation was observed before/at a resumption point.
    #[error("task cancelled")]
    Canceled,
}

impl TaskError {
    /// Wraps any displayable error as a task failure.
    pub fn failed(error: impl std::fmt::Display) -> Self {
        TaskError::Failed {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskweave::TaskError;
    ///
    /// assert_eq!(TaskError::Canceled.as_label(), "task_cancelled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Failed { .. } => "task_failed",
            TaskError::TimedOut { .. } => "task_timed_out",
            TaskError::Canceled => "task_cancelled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Failed { error } => format!("error: {error}"),
            TaskError::TimedOut { budget } => format!("timeout: {budget:?}"),
            TaskError::Canceled => "cancelled".to_string(),
        }
    }
}

impl From<HttpError> for TaskError {
    /// Lets task bodies propagate HTTP outcomes with `?`.
    fn from(err: HttpError) -> Self {
        TaskError::failed(err)
    }
}

/// # Errors produced by HTTP request execution.
///
/// Retry exhaustion surfaces the *last* attempt's failure (a response for
/// status-driven retries, a transport source otherwise) so the caller can
/// act on the real cause rather than a synthetic "too many retries".
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HttpError {
    /// Network/connect/TLS-level failure (including per-transfer deadline
    /// expiry); always retry-eligible, this is the terminal form.
    #[error("transport error after {attempts} attempt(s): {source}")]
    Transport {
        /// Attempts performed, including the first.
        attempts: u32,
        /// The last attempt's transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Response status was not deliverable: either outside 2xx/3xx and not
    /// retry-eligible, or retry-eligible with the attempt budget exhausted.
    #[error("http status {} after {attempts} attempt(s)", .response.status())]
    Status {
        /// Attempts performed, including the first.
        attempts: u32,
        /// The last attempt's full response.
        response: Response,
    },

    /// Descriptor could not be turned into a request (bad URL or header);
    /// fails immediately without consuming a retry or an in-flight slot.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// What was malformed.
        reason: String,
    },

    /// Client shut down before the outcome was delivered.
    #[error("http client closed")]
    Closed,
}

impl HttpError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HttpError::Transport { .. } => "http_transport_error",
            HttpError::Status { .. } => "http_status_error",
            HttpError::InvalidRequest { .. } => "http_invalid_request",
            HttpError::Closed => "http_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HttpError::Transport { attempts, source } => {
                format!("transport error after {attempts} attempt(s): {source}")
            }
            HttpError::Status { attempts, response } => {
                format!("status {} after {attempts} attempt(s)", response.status())
            }
            HttpError::InvalidRequest { reason } => format!("invalid request: {reason}"),
            HttpError::Closed => "client closed".to_string(),
        }
    }

    /// The last response's status, when one was received.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            HttpError::Status { response, .. } => Some(response.status()),
            _ => None,
        }
    }

    /// The last response, when one was received.
    pub fn response(&self) -> Option<&Response> {
        match self {
            HttpError::Status { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Attempts performed before this outcome became terminal.
    pub fn attempts(&self) -> u32 {
        match self {
            HttpError::Transport { attempts, .. } | HttpError::Status { attempts, .. } => *attempts,
            HttpError::InvalidRequest { .. } | HttpError::Closed => 0,
        }
    }
}

/// # Errors produced by the scheduler runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Shutdown grace period was exceeded; some tasks were still live.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Ids of tasks that had not reached a terminal state in time.
        stuck: Vec<TaskId>,
    },
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::GraceExceeded { .. } => "scheduler_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SchedulerError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck tasks={stuck:?}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_labels() {
        assert_eq!(TaskError::failed("boom").as_label(), "task_failed");
        assert_eq!(
            TaskError::TimedOut {
                budget: Duration::from_secs(1)
            }
            .as_label(),
            "task_timed_out"
        );
        assert_eq!(TaskError::Canceled.as_label(), "task_cancelled");
    }

    #[test]
    fn test_http_error_from_propagates_message() {
        let err: TaskError = HttpError::InvalidRequest {
            reason: "empty url".into(),
        }
        .into();
        match err {
            TaskError::Failed { error } => assert!(error.contains("empty url")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_http_error_attempts() {
        let err = HttpError::InvalidRequest {
            reason: "bad".into(),
        };
        assert_eq!(err.attempts(), 0);
        assert!(err.status().is_none());
        assert_eq!(err.as_label(), "http_invalid_request");
    }

    #[test]
    fn test_grace_exceeded_message_lists_stuck_tasks() {
        let err = SchedulerError::GraceExceeded {
            grace: Duration::from_secs(5),
            stuck: Vec::new(),
        };
        assert_eq!(err.as_label(), "scheduler_grace_exceeded");
        assert!(err.as_message().contains("5s"));
    }
}
