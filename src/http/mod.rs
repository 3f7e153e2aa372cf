//! Concurrent HTTP: descriptors, retry policy, and the multiplexing client.
//!
//! This module contains the HTTP half of the runtime:
//! - [`HttpClient`] - bounded-concurrency client over one multiplexing primitive;
//! - [`PendingResponse`] - per-request future, resolved independently;
//! - [`RequestDescriptor`] / [`Response`] - immutable call description and owned outcome.
//!
//! Internal modules:
//! - [`dispatcher`]: the drive loop (admission, transfers, retry re-queue);
//! - [`policy`]: per-attempt classification against the configured retry policy.

mod client;
mod dispatcher;
mod policy;
mod request;

pub use client::{HttpClient, PendingResponse};
pub use request::{RequestDescriptor, Response};

// Re-exported so callers can build descriptors and inspect responses
// without depending on reqwest directly.
pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
pub use reqwest::{Method, StatusCode};
