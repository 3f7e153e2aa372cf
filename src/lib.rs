//! # taskweave
//!
//! **Taskweave** is a cooperative execution core: a task scheduler that runs
//! many logical tasks on one thread of control, and a concurrent HTTP client
//! that multiplexes many outbound requests through a single I/O primitive,
//! both under bounded concurrency, with timeout enforcement, retry policy,
//! and a pluggable metrics port.
//!
//! ## Architecture
//! ```text
//!  spawn(work)                      request(descriptor)
//!      │                                 │
//!      ▼                                 ▼
//! ┌───────────────────────┐     ┌───────────────────────────┐
//! │ Scheduler             │     │ HttpClient                │
//! │  - FIFO admission     │     │  - FIFO admission          │
//! │    (≤ max_concurrent_ │     │    (≤ max_concurrent)      │
//! │     tasks slots)      │     │  - one reqwest::Client     │
//! │  - wall-clock budget  │     │    (multiplexer, owned)    │
//! │  - cooperative cancel │     │  - retry_on_status +       │
//! └──────┬────────────────┘     │    fixed retry delay       │
//!        │ TaskContext::wait    └──────────┬────────────────┘
//!        │   (suspension point)            │ PendingResponse
//!        ▼                                 ▼
//!   TaskHandle (state / result)      Result<Response, HttpError>
//!
//!        both report counters/durations ──► Metrics port
//! ```
//!
//! A task may, while running, submit requests and suspend on their futures
//! via [`TaskContext::wait`]; the two concurrency bounds are independent, so
//! a saturated scheduler does not imply a saturated client, nor vice versa.
//!
//! ## Concurrency model
//! All concurrency is *logical*: many tasks and transfers interleave at
//! well-defined await points on one control flow, with no preemption. The
//! whole crate runs on a `current_thread` tokio runtime. Suspension happens
//! at exactly two places: a task awaiting through [`TaskContext::wait`],
//! and the client's drive loop waiting (at most `poll_interval_seconds`)
//! for socket activity. Cancellation is cooperative only: it is observed at
//! suspension points, never mid-computation, and a cancelled task's
//! in-flight requests finish naturally with their results discarded.
//!
//! | Area          | Description                                              | Key types                                  |
//! |---------------|----------------------------------------------------------|--------------------------------------------|
//! | **Scheduling**| Bounded FIFO admission, wall-clock budgets, cancellation | [`Scheduler`], [`TaskHandle`], [`TaskState`]|
//! | **HTTP**      | Multiplexed transfers, status/transport retry policy     | [`HttpClient`], [`RequestDescriptor`]       |
//! | **Errors**    | Terminal outcomes, last-cause retry exhaustion           | [`TaskError`], [`HttpError`]                |
//! | **Metrics**   | Counters/durations behind a narrow injected port         | [`Metrics`], [`NoopMetrics`], [`LogMetrics`]|
//! | **Config**    | Flat construction-time settings, `0` = unbounded         | [`Config`]                                  |
//!
//! ## Example
//! ```rust
//! use taskweave::{Config, Scheduler, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let cfg = Config::default();
//!     let scheduler = Scheduler::new(cfg.scheduler);
//!
//!     let task = scheduler.spawn(|ctx| async move {
//!         // Suspend on anything awaitable; cancellation is observed here.
//!         let doubled = ctx.wait(async { 21 * 2 }).await?;
//!         Ok::<_, TaskError>(doubled)
//!     });
//!
//!     scheduler.join().await;
//!     assert_eq!(task.wait().await.unwrap(), 42);
//! }
//! ```

mod config;
mod error;
mod http;
mod scheduler;

pub mod metrics;

// ---- Public re-exports ----

pub use config::{Config, HttpConfig, SchedulerConfig};
pub use error::{HttpError, SchedulerError, TaskError};
pub use http::{HttpClient, PendingResponse, RequestDescriptor, Response};
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
pub use metrics::{LogMetrics, Metrics, MetricsRef, NoopMetrics};
pub use scheduler::{Scheduler, TaskContext, TaskHandle, TaskId, TaskState};

#[cfg(test)]
mod tests {
    //! End-to-end scenarios across the scheduler and the HTTP client.

    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_http() -> HttpConfig {
        HttpConfig {
            poll_interval_seconds: 0.001,
            ..HttpConfig::default()
        }
    }

    #[tokio::test]
    async fn test_three_tasks_two_slots_each_fetch_once() {
        let server = MockServer::start().await;
        for (route, body) in [("/a", "alpha"), ("/b", "beta"), ("/c", "gamma")] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .expect(1)
                .mount(&server)
                .await;
        }

        let scheduler = Scheduler::new(SchedulerConfig {
            max_concurrent_tasks: 2,
            max_task_execution_seconds: 0.0,
        });
        let client = HttpClient::new(fast_http());

        let handles: Vec<_> = ["/a", "/b", "/c"]
            .into_iter()
            .map(|route| {
                let client = client.clone();
                let url = format!("{}{route}", server.uri());
                scheduler.spawn(move |ctx| async move {
                    let resp = ctx.wait(client.request(RequestDescriptor::get(url))).await??;
                    Ok::<_, TaskError>(resp.text())
                })
            })
            .collect();

        scheduler.join().await;

        let mut bodies = Vec::new();
        for handle in handles {
            assert_eq!(handle.state(), TaskState::Completed);
            bodies.push(handle.wait().await.expect("task result"));
        }
        assert_eq!(bodies, vec!["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn test_cancelled_task_discards_inflight_http_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
            .expect(1)
            .mount(&server)
            .await;

        let scheduler = Scheduler::new(SchedulerConfig::default());
        let client = HttpClient::new(fast_http());

        let delivered = Arc::new(AtomicBool::new(false));
        let delivered_probe = Arc::clone(&delivered);
        let url = format!("{}/slow", server.uri());
        let handle = scheduler.spawn(move |ctx| async move {
            let outcome = ctx.wait(client.request(RequestDescriptor::get(url))).await?;
            delivered_probe.store(true, Ordering::SeqCst);
            let resp = outcome?;
            Ok::<_, TaskError>(resp.status().as_u16())
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.state(), TaskState::Suspended);
        handle.cancel();

        assert!(matches!(handle.wait().await, Err(TaskError::Canceled)));
        scheduler.join().await;

        // The transfer finishes naturally (expect(1) verifies it was made),
        // but its result reaches no observer.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!delivered.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_scheduler_and_client_bounds_are_independent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/probe"))
            .respond_with(ResponseTemplate::new(200))
            .expect(4)
            .mount(&server)
            .await;

        // One task fans out four requests: the scheduler slot count stays at
        // one while the client runs all transfers concurrently.
        let scheduler = Scheduler::new(SchedulerConfig {
            max_concurrent_tasks: 1,
            max_task_execution_seconds: 0.0,
        });
        let client = HttpClient::new(fast_http());

        let url = format!("{}/probe", server.uri());
        let handle = scheduler.spawn(move |ctx| async move {
            let descs = (0..4).map(|_| RequestDescriptor::get(url.clone())).collect();
            let outcomes = ctx
                .wait(futures::future::join_all(client.request_many(descs)))
                .await?;
            let mut ok = 0;
            for outcome in outcomes {
                outcome?;
                ok += 1;
            }
            Ok::<_, TaskError>(ok)
        });

        scheduler.join().await;
        assert_eq!(handle.wait().await.expect("all fetches succeed"), 4);
    }
}
