//! # HttpClient: concurrent requests over one multiplexing primitive.
//!
//! The client is a thin, cloneable handle over a background
//! [`Dispatcher`](super::dispatcher::Dispatcher): submissions go down an
//! unbounded channel (submission never blocks; admission queuing happens
//! inside the drive loop), outcomes come back through per-request oneshot
//! futures that resolve independently.
//!
//! ```text
//!   request(desc) ──► [submission channel] ──► Dispatcher ──► reqwest::Client
//!        │                                         │
//!        └◄──────────── PendingResponse ◄──────────┘
//! ```
//!
//! The client is usable on its own or from inside scheduler tasks; it keeps
//! its own in-flight bound, independent of the scheduler's admission bound.
//!
//! ## Shutdown
//! - Dropping every clone closes the channel; the dispatcher finishes the
//!   work it already accepted, then exits.
//! - [`HttpClient::shutdown`] aborts instead: undelivered outcomes resolve
//!   [`HttpError::Closed`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::dispatcher::{Dispatcher, Submission};
use super::request::{RequestDescriptor, Response};
use crate::config::HttpConfig;
use crate::error::HttpError;
use crate::metrics::{MetricsRef, NoopMetrics};

/// Issues many HTTP requests concurrently with bounded in-flight transfers,
/// periodic polling, and a configurable retry policy.
#[derive(Clone)]
pub struct HttpClient {
    tx: mpsc::UnboundedSender<Submission>,
    token: CancellationToken,
}

impl HttpClient {
    /// Creates a client with no telemetry configured.
    pub fn new(cfg: HttpConfig) -> Self {
        Self::with_metrics(cfg, Arc::new(NoopMetrics))
    }

    /// Creates a client reporting through the given metrics port.
    ///
    /// Spawns the dispatcher that exclusively owns this client's
    /// `reqwest::Client` instance.
    pub fn with_metrics(cfg: HttpConfig, metrics: MetricsRef) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        tokio::spawn(Dispatcher::new(cfg, metrics, rx, token.clone()).run());
        Self { tx, token }
    }

    /// Submits one request; never blocks.
    ///
    /// The returned future resolves with the request's own terminal outcome,
    /// independent of every other submission. Dropping the future discards
    /// the outcome: the transfer finishes (or fails) naturally and its
    /// result is delivered to no one.
    pub fn request(&self, desc: RequestDescriptor) -> PendingResponse {
        let (reply, rx) = oneshot::channel();
        let submission = Submission {
            desc,
            submitted_at: Instant::now(),
            reply,
        };
        // A closed channel drops the submission, and with it the reply
        // sender; the future below then resolves with Closed.
        let _ = self.tx.send(submission);
        PendingResponse { rx }
    }

    /// Submits a batch; each future resolves independently as its own
    /// outcome becomes available.
    pub fn request_many(&self, descs: Vec<RequestDescriptor>) -> Vec<PendingResponse> {
        descs.into_iter().map(|desc| self.request(desc)).collect()
    }

    /// Aborts the dispatcher. In-flight transfers are dropped and every
    /// undelivered outcome resolves [`HttpError::Closed`].
    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

/// Future side of one submitted request.
#[derive(Debug)]
pub struct PendingResponse {
    rx: oneshot::Receiver<Result<Response, HttpError>>,
}

impl Future for PendingResponse {
    type Output = Result<Response, HttpError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|res| match res {
            Ok(outcome) => outcome,
            Err(_) => Err(HttpError::Closed),
        })
    }
}
