//! # TaskContext: the cooperative suspension point.
//!
//! Every task body receives a [`TaskContext`]. Its [`wait`](TaskContext::wait)
//! method is the one place a task yields control: the task transitions
//! `Running → Suspended`, the given future races the cancellation token, and
//! on resumption the task transitions back `Suspended → Running`. Suspension
//! never happens implicitly mid-expression anywhere else.
//!
//! ## Rules
//! - Cancellation is only observed here (and at admission): `wait` returns
//!   [`TaskError::Canceled`] for the body to propagate with `?`, and the
//!   awaited future is dropped; an in-flight HTTP outcome it carried is
//!   discarded by the client, never delivered.
//! - `wait` on an already-cancelled context returns immediately without
//!   suspending.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::handle::{TaskId, TaskState};
use crate::error::TaskError;
use crate::metrics::{names, MetricsRef};

/// Execution context handed to a task body.
///
/// Cheap to clone; all clones refer to the same task.
#[derive(Clone)]
pub struct TaskContext {
    id: TaskId,
    cancel: CancellationToken,
    state: Arc<watch::Sender<TaskState>>,
    metrics: MetricsRef,
}

impl TaskContext {
    pub(crate) fn new(
        id: TaskId,
        cancel: CancellationToken,
        state: Arc<watch::Sender<TaskState>>,
        metrics: MetricsRef,
    ) -> Self {
        Self {
            id,
            cancel,
            state,
            metrics,
        }
    }

    /// The owning task's id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The task's cancellation token, for bodies that run their own loops
    /// and want to observe shutdown between units of work.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Suspends the task until `fut` resolves or cancellation is observed.
    ///
    /// Returns the future's output, or [`TaskError::Canceled`] if the task
    /// was cancelled before or during the suspension. On cancellation `fut`
    /// is dropped; whatever it was waiting on finishes (or fails) naturally
    /// and its result goes nowhere.
    pub async fn wait<F>(&self, fut: F) -> Result<F::Output, TaskError>
    where
        F: Future,
    {
        if self.cancel.is_cancelled() {
            return Err(TaskError::Canceled);
        }

        self.transition(TaskState::Suspended, names::TASK_SUSPENDED);
        tokio::select! {
            out = fut => {
                self.transition(TaskState::Running, names::TASK_RESUMED);
                Ok(out)
            }
            _ = self.cancel.cancelled() => Err(TaskError::Canceled),
        }
    }

    fn transition(&self, state: TaskState, counter: &'static str) {
        self.state.send_replace(state);
        self.metrics.incr(counter);
        tracing::trace!(target: "taskweave::scheduler", task = %self.id, state = state.as_label());
    }
}
