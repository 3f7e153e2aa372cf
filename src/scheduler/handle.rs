//! # Task identity, lifecycle states, and the caller-side handle.
//!
//! Every spawned task gets a [`TaskId`] (opaque, monotonically increasing)
//! and moves through the [`TaskState`] machine:
//!
//! ```text
//! Pending ──► Running ◄──► Suspended
//!                │
//!                ▼
//!   { Completed | Failed | Cancelled | TimedOut }
//! ```
//!
//! Terminal states are mutually exclusive and final. The scheduler's runner
//! is the only writer; callers observe through [`TaskHandle`]: poll with
//! [`TaskHandle::state`], await transitions with [`TaskHandle::wait_terminal`],
//! or consume the handle with [`TaskHandle::wait`] for the result.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Process-global counter backing [`TaskId::next`].
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque, monotonically increasing task identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocates the next id.
    pub(crate) fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric form, for logs and diagnostics.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Lifecycle state of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Spawned, waiting for an admission slot.
    Pending,
    /// Holding a slot, body executing.
    Running,
    /// Holding a slot, parked at a cooperative suspension point.
    Suspended,
    /// Terminal: body returned a value.
    Completed,
    /// Terminal: body returned an error or panicked; error captured.
    Failed,
    /// Terminal: cooperative cancellation observed.
    Cancelled,
    /// Terminal: wall-clock execution budget exceeded.
    TimedOut,
}

impl TaskState {
    /// True for the four final states.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled | TaskState::TimedOut
        )
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Suspended => "suspended",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
            TaskState::TimedOut => "timed_out",
        }
    }
}

/// Caller-side handle to a spawned task.
///
/// Observation is the caller's choice: [`state`](Self::state) polls without
/// blocking, [`wait_terminal`](Self::wait_terminal) awaits finality while
/// keeping the handle, and [`wait`](Self::wait) consumes the handle for the
/// result. Dropping the handle detaches: the task still runs to a terminal
/// state and its result is discarded.
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    state: watch::Receiver<TaskState>,
    outcome: oneshot::Receiver<Result<T, TaskError>>,
    cancel: CancellationToken,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(
        id: TaskId,
        state: watch::Receiver<TaskState>,
        outcome: oneshot::Receiver<Result<T, TaskError>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            state,
            outcome,
            cancel,
        }
    }

    /// The task's id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Current lifecycle state (non-blocking).
    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    /// Requests cooperative cancellation.
    ///
    /// Not preemptive: a task waiting for admission is finalized as
    /// `Cancelled` without starting; a running task observes the request at
    /// its next suspension point. A body that finishes without reaching one
    /// keeps its own outcome.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits until the task reaches a terminal state and returns it.
    pub async fn wait_terminal(&mut self) -> TaskState {
        match self.state.wait_for(|s| s.is_terminal()).await {
            Ok(state) => *state,
            // Writer gone; the last observed value is the final one.
            Err(_) => *self.state.borrow(),
        }
    }

    /// Consumes the handle and waits for the task's result.
    pub async fn wait(self) -> Result<T, TaskError> {
        self.outcome
            .await
            .unwrap_or_else(|_| Err(TaskError::Canceled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_ids_are_monotonic() {
        let a = TaskId::next();
        let b = TaskId::next();
        let c = TaskId::next();
        assert!(a < b && b < c);
        assert_eq!(format!("{a}"), format!("task-{}", a.as_u64()));
    }

    #[test]
    fn test_terminal_states() {
        for state in [
            TaskState::Completed,
            TaskState::Failed,
            TaskState::Cancelled,
            TaskState::TimedOut,
        ] {
            assert!(state.is_terminal(), "{} should be terminal", state.as_label());
        }
        for state in [TaskState::Pending, TaskState::Running, TaskState::Suspended] {
            assert!(!state.is_terminal(), "{} is not terminal", state.as_label());
        }
    }
}
