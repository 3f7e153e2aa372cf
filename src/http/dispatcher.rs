//! # Dispatcher: the client's single drive loop.
//!
//! One dispatcher per [`HttpClient`](super::HttpClient), exclusively owning
//! one `reqwest::Client`: the multiplexing primitive that tracks every
//! concurrent transfer. The loop is the only control flow that touches the
//! in-flight set, so no locks are needed and the drive step can never be
//! entered re-entrantly.
//!
//! ## Drive step
//! ```text
//! loop {
//!   admit: queue ──► in-flight     (FIFO, while below max_concurrent)
//!   wait (≤ poll_interval) for one of:
//!     ├─ submission      ──► validate; queue or reject(InvalidRequest)
//!     ├─ transfer done   ──► assess: deliver / fail / park for retry
//!     ├─ retry delay up  ──► back of the queue (re-registered, not inline)
//!     ├─ channel closed  ──► drain and exit
//!     └─ token cancelled ──► exit; undelivered replies resolve Closed
//! }
//! ```
//!
//! ## Rules
//! - A descriptor waiting out its retry delay holds **no** in-flight slot;
//!   only actively-transferring descriptors count against the cap.
//! - Outcomes whose receiver is gone (caller dropped the future, task was
//!   cancelled) are discarded silently — delivery is never attempted twice.
//! - Attempt counts are 1-based and never exceed `max_retries + 1`.

use std::collections::VecDeque;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::policy::{assess, Verdict};
use super::request::{RequestDescriptor, Response};
use crate::config::HttpConfig;
use crate::error::HttpError;
use crate::metrics::{names, MetricsRef};

/// One submitted request on its way to the dispatcher.
pub(crate) struct Submission {
    pub desc: RequestDescriptor,
    pub submitted_at: Instant,
    pub reply: oneshot::Sender<Result<Response, HttpError>>,
}

/// A validated request owned by the drive loop.
struct Job {
    desc: RequestDescriptor,
    url: Url,
    headers: HeaderMap,
    /// Completed attempts, 1-based once launched.
    attempts: u32,
    submitted_at: Instant,
    reply: oneshot::Sender<Result<Response, HttpError>>,
}

/// A transfer that finished, successfully or not.
struct Finished {
    job: Job,
    outcome: Result<Response, reqwest::Error>,
}

/// What one wait step observed.
enum Activity {
    Shutdown,
    Submitted(Option<Submission>),
    Completed(Finished),
    RetryReady(Job),
    Tick,
}

pub(crate) struct Dispatcher {
    cfg: HttpConfig,
    metrics: MetricsRef,
    client: reqwest::Client,
    rx: mpsc::UnboundedReceiver<Submission>,
    token: CancellationToken,
    queue: VecDeque<Job>,
    inflight: FuturesUnordered<BoxFuture<'static, Finished>>,
    waiting: FuturesUnordered<BoxFuture<'static, Job>>,
}

impl Dispatcher {
    pub(crate) fn new(
        cfg: HttpConfig,
        metrics: MetricsRef,
        rx: mpsc::UnboundedReceiver<Submission>,
        token: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            metrics,
            client: reqwest::Client::new(),
            rx,
            token,
            queue: VecDeque::new(),
            inflight: FuturesUnordered::new(),
            waiting: FuturesUnordered::new(),
        }
    }

    /// Runs the drive loop until shutdown or until the submission channel
    /// closes and all accepted work has settled.
    pub(crate) async fn run(mut self) {
        let poll_interval = self.cfg.poll_interval();
        let mut closed = false;

        loop {
            self.admit();
            if closed
                && self.queue.is_empty()
                && self.inflight.is_empty()
                && self.waiting.is_empty()
            {
                break;
            }

            // An empty in-flight/waiting set resolves its stream to None,
            // which fails the pattern and disables that branch for this
            // wait step.
            let activity = tokio::select! {
                _ = self.token.cancelled() => Activity::Shutdown,
                submission = self.rx.recv(), if !closed => Activity::Submitted(submission),
                Some(finished) = self.inflight.next() => Activity::Completed(finished),
                Some(job) = self.waiting.next() => Activity::RetryReady(job),
                _ = time::sleep(poll_interval) => Activity::Tick,
            };

            match activity {
                Activity::Shutdown => break,
                Activity::Submitted(Some(submission)) => self.enqueue(submission),
                Activity::Submitted(None) => closed = true,
                Activity::Completed(finished) => self.settle(finished),
                Activity::RetryReady(job) => self.queue.push_back(job),
                Activity::Tick => {}
            }
        }
        // Hard shutdown path: queued and in-flight replies drop here and the
        // corresponding futures resolve with HttpError::Closed.
    }

    /// Validates a submission into a job, or rejects it before admission.
    fn enqueue(&mut self, submission: Submission) {
        match prepare(&submission.desc) {
            Ok((url, headers)) => self.queue.push_back(Job {
                desc: submission.desc,
                url,
                headers,
                attempts: 0,
                submitted_at: submission.submitted_at,
                reply: submission.reply,
            }),
            Err(reason) => {
                self.metrics.incr(names::HTTP_REJECTED);
                tracing::debug!(target: "taskweave::http", %reason, "rejected malformed request");
                let _ = submission
                    .reply
                    .send(Err(HttpError::InvalidRequest { reason }));
            }
        }
    }

    /// Moves queued jobs into the in-flight set, FIFO, up to the cap.
    fn admit(&mut self) {
        while !self.queue.is_empty() && self.has_capacity() {
            if let Some(job) = self.queue.pop_front() {
                self.launch(job);
            }
        }
    }

    fn has_capacity(&self) -> bool {
        self.cfg
            .max_inflight()
            .map_or(true, |cap| self.inflight.len() < cap)
    }

    /// Hands one job to the multiplexer as a new attempt.
    fn launch(&mut self, mut job: Job) {
        job.attempts += 1;
        self.metrics.incr(names::HTTP_ATTEMPT);
        tracing::trace!(
            target: "taskweave::http",
            url = %job.url,
            attempt = job.attempts,
            "transfer started"
        );
        let client = self.client.clone();
        self.inflight.push(Box::pin(async move {
            let outcome = perform(&client, &job).await;
            Finished { job, outcome }
        }));
    }

    /// Applies the retry policy to one finished transfer.
    fn settle(&mut self, finished: Finished) {
        let Finished { job, outcome } = finished;
        match assess(&self.cfg, job.attempts, outcome) {
            Verdict::Deliver(response) => {
                self.metrics.incr(names::HTTP_SUCCESS);
                self.metrics
                    .record(names::HTTP_DURATION, job.submitted_at.elapsed());
                let _ = job.reply.send(Ok(response));
            }
            Verdict::Fail(err) => {
                let counter = match &err {
                    HttpError::Status { .. } => names::HTTP_STATUS_ERROR,
                    HttpError::Transport { .. } => names::HTTP_TRANSPORT_ERROR,
                    _ => names::HTTP_REJECTED,
                };
                self.metrics.incr(counter);
                self.metrics
                    .record(names::HTTP_DURATION, job.submitted_at.elapsed());
                tracing::debug!(
                    target: "taskweave::http",
                    url = %job.url,
                    attempts = job.attempts,
                    error = err.as_label(),
                    "request failed"
                );
                let _ = job.reply.send(Err(err));
            }
            Verdict::Retry(cause) => {
                self.metrics.incr(names::HTTP_RETRY);
                let delay = self.cfg.retry_delay();
                tracing::debug!(
                    target: "taskweave::http",
                    url = %job.url,
                    attempt = job.attempts,
                    delay_ms = delay.as_millis() as u64,
                    cause = %cause,
                    "retrying request"
                );
                // The job leaves the in-flight set for the duration of the
                // delay; it re-enters through the queue like a fresh arrival.
                self.waiting.push(Box::pin(async move {
                    time::sleep(delay).await;
                    job
                }));
            }
        }
    }
}

/// Parses the descriptor's URL and headers; an error here fails the request
/// before it ever reaches the multiplexer.
fn prepare(desc: &RequestDescriptor) -> Result<(Url, HeaderMap), String> {
    let url = Url::parse(desc.url()).map_err(|e| format!("url `{}`: {e}", desc.url()))?;
    let mut headers = HeaderMap::new();
    for (name, value) in desc.headers() {
        let name = HeaderName::try_from(name.as_str()).map_err(|e| format!("header `{name}`: {e}"))?;
        let value =
            HeaderValue::try_from(value.as_str()).map_err(|e| format!("header `{name}`: {e}"))?;
        headers.append(name, value);
    }
    Ok((url, headers))
}

/// Executes one attempt and drains the response.
async fn perform(client: &reqwest::Client, job: &Job) -> Result<Response, reqwest::Error> {
    let mut req = client
        .request(job.desc.method().clone(), job.url.clone())
        .headers(job.headers.clone());
    if let Some(timeout) = job.desc.timeout() {
        req = req.timeout(timeout);
    }
    if let Some(body) = job.desc.body() {
        req = req.body(body.to_vec());
    }
    let resp = req.send().await?;
    Response::read(resp).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_rejects_malformed_url() {
        let err = prepare(&RequestDescriptor::get("not a url")).expect_err("must reject");
        assert!(err.contains("not a url"));
    }

    #[test]
    fn test_prepare_rejects_malformed_header() {
        let desc = RequestDescriptor::get("http://example.com/").with_header("bad name", "x");
        assert!(prepare(&desc).is_err());
    }

    #[test]
    fn test_prepare_keeps_duplicate_headers() {
        let desc = RequestDescriptor::get("http://example.com/")
            .with_header("x-trace", "a")
            .with_header("x-trace", "b");
        let (url, headers) = prepare(&desc).expect("valid descriptor");
        assert_eq!(url.as_str(), "http://example.com/");
        let values: Vec<_> = headers.get_all("x-trace").iter().collect();
        assert_eq!(values.len(), 2);
    }
}
