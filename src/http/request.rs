//! # Request descriptors and owned responses.
//!
//! [`RequestDescriptor`] is an immutable description of one outbound call:
//! method, URL, an ordered header multimap, an optional byte body, and an
//! optional per-transfer deadline. Descriptors are built with `with_*`
//! combinators and handed to the client; retry bookkeeping lives in the
//! dispatcher, never on the descriptor.
//!
//! [`Response`] is the fully-read result of a transfer (status, headers,
//! body bytes), owned so a terminal error can carry the last attempt's
//! response for inspection.

use std::fmt;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};

/// Immutable description of one outbound HTTP call.
///
/// ## Example
/// ```
/// use std::time::Duration;
/// use taskweave::RequestDescriptor;
///
/// let desc = RequestDescriptor::post("https://api.example.com/v1/items")
///     .with_header("accept", "application/json")
///     .with_header("x-trace", "a")
///     .with_header("x-trace", "b") // duplicates kept, in order
///     .with_body(br#"{"name":"widget"}"#.to_vec())
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(desc.headers().len(), 3);
/// ```
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl RequestDescriptor {
    /// Creates a descriptor for an arbitrary method.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// `GET` shorthand.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// `POST` shorthand.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// `HEAD` shorthand.
    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::HEAD, url)
    }

    /// Appends a header; repeated names are kept in append order.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attaches a byte payload.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the per-transfer deadline. Expiry counts as a transport error
    /// and is subject to the retry policy like any other.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The target URL, unparsed.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Headers in append order, duplicates included.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The body payload, if any.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// The per-transfer deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Fully-read outcome of one HTTP transfer.
#[derive(Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub(crate) fn from_parts(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Drains a live transfer into an owned response.
    ///
    /// A body-read failure is a transport error like any other.
    pub(crate) async fn read(resp: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?.to_vec();
        Ok(Self::from_parts(status, headers, body))
    }

    /// The response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The response body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// True when the status counts as delivered (2xx or 3xx).
    pub fn is_deliverable(&self) -> bool {
        self.status.is_success() || self.status.is_redirection()
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers.len())
            .field("body_len", &self.body.len())
            .finish()
    }
}
