//! # Scheduler: bounded cooperative execution of many tasks.
//!
//! The [`Scheduler`] owns the admission semaphore, the per-task execution
//! budget, and the live-task set. Each [`spawn`](Scheduler::spawn) launches a
//! runner that takes the task through its whole lifecycle and settles the
//! caller's [`TaskHandle`].
//!
//! ## High-level flow
//! ```text
//! spawn(work) ──► TaskRunner
//!                   │  acquire slot (fair FIFO semaphore; cancellable wait)
//!                   │  Pending ──► Running
//!                   │  body under optional wall-clock budget
//!                   │      │ ctx.wait(...)  Running ◄──► Suspended
//!                   │      ▼
//!                   │  classify outcome
//!                   └► terminal state + metrics + result ──► TaskHandle
//! ```
//!
//! ## Rules
//! - Admission is FIFO: tasks that arrive while the active set is full are
//!   served strictly in arrival order once capacity frees (the semaphore
//!   queues acquirers fairly).
//! - A task holds exactly one slot from admission to its terminal state;
//!   the permit is dropped once, with the runner.
//! - The execution budget is cooperative: expiry drops the body at the await
//!   point it is parked on, so a body that never yields overruns until its
//!   next suspension point. The bound is documented, not tightened.
//! - A failing or panicking body is captured on its own handle and never
//!   disturbs the scheduler or sibling tasks.

use std::any::Any;
use std::collections::BTreeSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch, OwnedSemaphorePermit, Semaphore};
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::context::TaskContext;
use super::handle::{TaskHandle, TaskId, TaskState};
use crate::config::SchedulerConfig;
use crate::error::{SchedulerError, TaskError};
use crate::metrics::{names, MetricsRef, NoopMetrics};

/// Runs many cooperative tasks with FIFO admission and per-task budgets.
pub struct Scheduler {
    budget: Option<Duration>,
    metrics: MetricsRef,
    semaphore: Option<Arc<Semaphore>>,
    live: Arc<LiveSet>,
    active: Arc<AtomicUsize>,
    root: CancellationToken,
}

impl Scheduler {
    /// Creates a scheduler with no telemetry configured.
    pub fn new(cfg: SchedulerConfig) -> Self {
        Self::with_metrics(cfg, Arc::new(NoopMetrics))
    }

    /// Creates a scheduler reporting through the given metrics port.
    pub fn with_metrics(cfg: SchedulerConfig, metrics: MetricsRef) -> Self {
        Self {
            budget: cfg.execution_budget(),
            semaphore: cfg.admission_bound().map(|n| Arc::new(Semaphore::new(n))),
            metrics,
            live: Arc::new(LiveSet::new()),
            active: Arc::new(AtomicUsize::new(0)),
            root: CancellationToken::new(),
        }
    }

    /// Enqueues `work` for execution and returns immediately.
    ///
    /// `work` receives a [`TaskContext`] and resolves to the task's result;
    /// use [`TaskContext::wait`] for anything the body needs to await. The
    /// caller observes progress and outcome through the returned
    /// [`TaskHandle`]; dropping the handle detaches the task.
    pub fn spawn<F, Fut, T>(&self, work: F) -> TaskHandle<T>
    where
        F: FnOnce(TaskContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
        T: Send + 'static,
    {
        let id = TaskId::next();
        let (state_tx, state_rx) = watch::channel(TaskState::Pending);
        let (out_tx, out_rx) = oneshot::channel();
        let cancel = self.root.child_token();

        self.live.insert(id);
        tracing::trace!(target: "taskweave::scheduler", task = %id, "spawned");

        let runner = TaskRunner {
            id,
            budget: self.budget,
            metrics: Arc::clone(&self.metrics),
            semaphore: self.semaphore.clone(),
            state: Arc::new(state_tx),
            cancel: cancel.clone(),
            live: Arc::clone(&self.live),
            active: Arc::clone(&self.active),
        };
        tokio::spawn(runner.run(work, out_tx));

        TaskHandle::new(id, state_rx, out_rx, cancel)
    }

    /// Requests cooperative cancellation of the given task.
    ///
    /// Equivalent to [`TaskHandle::cancel`]; see there for semantics.
    pub fn cancel<T>(&self, handle: &TaskHandle<T>) {
        handle.cancel();
    }

    /// Number of tasks currently holding an admission slot
    /// (`Running` or `Suspended`).
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of tasks not yet in a terminal state (including `Pending`).
    pub fn live_count(&self) -> usize {
        *self.live.count.borrow()
    }

    /// Waits until every spawned task has reached a terminal state.
    ///
    /// Resolves immediately when nothing is live. New tasks may be spawned
    /// while waiting; they are waited for too.
    pub async fn join(&self) {
        self.live.quiesced().await;
    }

    /// Cancels all live tasks and waits up to `grace` for them to finalize.
    ///
    /// Tasks that have not reached a terminal state within the grace period
    /// are reported in [`SchedulerError::GraceExceeded`]; they keep their
    /// slots until they observe the cancellation.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), SchedulerError> {
        self.root.cancel();
        match time::timeout(grace, self.live.quiesced()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(SchedulerError::GraceExceeded {
                grace,
                stuck: self.live.snapshot(),
            }),
        }
    }
}

/// Tracks ids of tasks that have not reached a terminal state.
struct LiveSet {
    count: watch::Sender<usize>,
    ids: Mutex<BTreeSet<TaskId>>,
}

impl LiveSet {
    fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            count,
            ids: Mutex::new(BTreeSet::new()),
        }
    }

    fn insert(&self, id: TaskId) {
        let n = {
            let mut ids = self.ids.lock();
            ids.insert(id);
            ids.len()
        };
        self.count.send_replace(n);
    }

    fn remove(&self, id: TaskId) {
        let n = {
            let mut ids = self.ids.lock();
            ids.remove(&id);
            ids.len()
        };
        self.count.send_replace(n);
    }

    fn snapshot(&self) -> Vec<TaskId> {
        self.ids.lock().iter().copied().collect()
    }

    async fn quiesced(&self) {
        let mut rx = self.count.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// Outcome of the admission step.
enum Admitted {
    /// Slot acquired (`None` when unbounded).
    Slot(Option<OwnedSemaphorePermit>),
    /// Cancelled while waiting; the task never starts.
    Cancelled,
}

/// Drives one task from admission to its terminal state.
struct TaskRunner {
    id: TaskId,
    budget: Option<Duration>,
    metrics: MetricsRef,
    semaphore: Option<Arc<Semaphore>>,
    state: Arc<watch::Sender<TaskState>>,
    cancel: CancellationToken,
    live: Arc<LiveSet>,
    active: Arc<AtomicUsize>,
}

impl TaskRunner {
    async fn run<F, Fut, T>(self, work: F, out: oneshot::Sender<Result<T, TaskError>>)
    where
        F: FnOnce(TaskContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
        T: Send + 'static,
    {
        let permit = match self.admit().await {
            Admitted::Slot(permit) => permit,
            Admitted::Cancelled => {
                self.finish(Instant::now(), TaskState::Cancelled, Err(TaskError::Canceled), out);
                return;
            }
        };

        self.metrics.incr(names::TASK_ADMITTED);
        self.active.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(TaskState::Running);
        self.metrics.incr(names::TASK_STARTED);
        let started = Instant::now();

        let ctx = TaskContext::new(
            self.id,
            self.cancel.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.metrics),
        );
        let body = AssertUnwindSafe(work(ctx)).catch_unwind();

        let (state, outcome) = match self.budget {
            Some(budget) => match time::timeout(budget, body).await {
                Ok(res) => classify(res),
                Err(_elapsed) => {
                    // The body was dropped at the await point it was parked
                    // on; anything it was waiting for resolves into the void.
                    self.cancel.cancel();
                    (TaskState::TimedOut, Err(TaskError::TimedOut { budget }))
                }
            },
            None => classify(body.await),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        drop(permit); // slot released exactly once
        self.finish(started, state, outcome, out);
    }

    async fn admit(&self) -> Admitted {
        match &self.semaphore {
            Some(sem) => {
                tokio::select! {
                    res = Arc::clone(sem).acquire_owned() => match res {
                        Ok(permit) => Admitted::Slot(Some(permit)),
                        Err(_closed) => Admitted::Cancelled,
                    },
                    _ = self.cancel.cancelled() => Admitted::Cancelled,
                }
            }
            None => {
                if self.cancel.is_cancelled() {
                    Admitted::Cancelled
                } else {
                    Admitted::Slot(None)
                }
            }
        }
    }

    fn finish<T>(
        &self,
        started: Instant,
        state: TaskState,
        outcome: Result<T, TaskError>,
        out: oneshot::Sender<Result<T, TaskError>>,
    ) {
        self.state.send_replace(state);
        self.metrics.incr(outcome_counter(state));
        self.metrics.record(names::TASK_DURATION, started.elapsed());
        tracing::debug!(
            target: "taskweave::scheduler",
            task = %self.id,
            state = state.as_label(),
            "finished"
        );
        // Receiver may be gone (detached caller); the result is discarded.
        let _ = out.send(outcome);
        self.live.remove(self.id);
    }
}

fn classify<T>(
    res: Result<Result<T, TaskError>, Box<dyn Any + Send>>,
) -> (TaskState, Result<T, TaskError>) {
    match res {
        Ok(Ok(value)) => (TaskState::Completed, Ok(value)),
        Ok(Err(err)) => {
            let state = match &err {
                TaskError::Canceled => TaskState::Cancelled,
                TaskError::TimedOut { .. } => TaskState::TimedOut,
                TaskError::Failed { .. } => TaskState::Failed,
            };
            (state, Err(err))
        }
        Err(panic) => (
            TaskState::Failed,
            Err(TaskError::Failed {
                error: panic_message(panic.as_ref()),
            }),
        ),
    }
}

fn outcome_counter(state: TaskState) -> &'static str {
    match state {
        TaskState::Completed => names::TASK_COMPLETED,
        TaskState::Failed => names::TASK_FAILED,
        TaskState::Cancelled => names::TASK_CANCELLED,
        TaskState::TimedOut => names::TASK_TIMED_OUT,
        // Non-terminal states never reach finish().
        _ => names::TASK_FAILED,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
