//! # Per-attempt retry classification.
//!
//! After every completed attempt the dispatcher asks [`assess`] what to do
//! with the outcome:
//!
//! - a 2xx/3xx response is **delivered**;
//! - a status in `retry_on_status`, or any transport error, is **retried**
//!   while attempts remain in the budget (`max_retries + 1`);
//! - everything else is **terminal**, carrying the last response or the last
//!   transport error so the caller sees the real cause.
//!
//! Transport errors are always retry-eligible regardless of the status set,
//! since they carry no status to check.

use std::fmt;

use reqwest::StatusCode;

use super::request::Response;
use crate::config::HttpConfig;
use crate::error::HttpError;

/// What the dispatcher does with one completed attempt.
pub(crate) enum Verdict {
    /// Resolve the request with this response.
    Deliver(Response),
    /// Queue a re-attempt after the configured delay.
    Retry(RetryCause),
    /// Resolve the request with this terminal error.
    Fail(HttpError),
}

/// Why a re-attempt was scheduled, for logs.
pub(crate) enum RetryCause {
    Status(StatusCode),
    Transport(String),
}

impl fmt::Display for RetryCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryCause::Status(code) => write!(f, "status {code}"),
            RetryCause::Transport(msg) => write!(f, "transport: {msg}"),
        }
    }
}

/// Classifies one completed attempt. `attempts` counts completed attempts
/// including this one (1-based).
pub(crate) fn assess(
    cfg: &HttpConfig,
    attempts: u32,
    outcome: Result<Response, reqwest::Error>,
) -> Verdict {
    match outcome {
        Ok(resp) if resp.is_deliverable() => Verdict::Deliver(resp),
        Ok(resp) => {
            if cfg.is_retryable_status(resp.status().as_u16()) && attempts < cfg.attempt_budget() {
                Verdict::Retry(RetryCause::Status(resp.status()))
            } else {
                Verdict::Fail(HttpError::Status {
                    attempts,
                    response: resp,
                })
            }
        }
        Err(err) => {
            if attempts < cfg.attempt_budget() {
                Verdict::Retry(RetryCause::Transport(err.to_string()))
            } else {
                Verdict::Fail(HttpError::Transport {
                    attempts,
                    source: err,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;

    fn response(status: u16) -> Response {
        Response::from_parts(
            StatusCode::from_u16(status).expect("valid status"),
            HeaderMap::new(),
            Vec::new(),
        )
    }

    fn config(max_retries: u32) -> HttpConfig {
        HttpConfig {
            max_retries,
            ..HttpConfig::default()
        }
    }

    #[test]
    fn test_deliverable_statuses_resolve_regardless_of_budget() {
        for status in [200, 204, 301, 304] {
            match assess(&config(0), 1, Ok(response(status))) {
                Verdict::Deliver(resp) => assert_eq!(resp.status().as_u16(), status),
                _ => panic!("{status} should deliver"),
            }
        }
    }

    #[test]
    fn test_retryable_status_within_budget_retries() {
        match assess(&config(2), 1, Ok(response(503))) {
            Verdict::Retry(RetryCause::Status(code)) => assert_eq!(code.as_u16(), 503),
            _ => panic!("503 with budget left should retry"),
        }
    }

    #[test]
    fn test_retryable_status_with_budget_exhausted_fails_with_last_response() {
        match assess(&config(2), 3, Ok(response(503))) {
            Verdict::Fail(HttpError::Status { attempts, response }) => {
                assert_eq!(attempts, 3);
                assert_eq!(response.status().as_u16(), 503);
            }
            _ => panic!("exhausted budget should fail with the last response"),
        }
    }

    #[test]
    fn test_non_retryable_status_fails_immediately() {
        match assess(&config(5), 1, Ok(response(404))) {
            Verdict::Fail(HttpError::Status { attempts, response }) => {
                assert_eq!(attempts, 1);
                assert_eq!(response.status().as_u16(), 404);
            }
            _ => panic!("404 should fail on the first attempt"),
        }
    }

    #[test]
    fn test_zero_retries_is_single_attempt() {
        match assess(&config(0), 1, Ok(response(429))) {
            Verdict::Fail(HttpError::Status { attempts, .. }) => assert_eq!(attempts, 1),
            _ => panic!("max_retries = 0 means exactly one attempt"),
        }
    }

    #[test]
    fn test_custom_status_set_is_honored() {
        let mut cfg = config(1);
        cfg.retry_on_status = vec![418];

        assert!(matches!(
            assess(&cfg, 1, Ok(response(418))),
            Verdict::Retry(RetryCause::Status(_))
        ));
        // 503 is retryable by default, but not in this configuration.
        assert!(matches!(
            assess(&cfg, 1, Ok(response(503))),
            Verdict::Fail(HttpError::Status { .. })
        ));
    }
}
