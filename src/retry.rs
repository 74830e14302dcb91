//! Retrying request executor.
//!
//! One logical call owns its attempt counter and its request descriptor.
//! Retries re-send the exact same descriptor after a fixed interval.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::{is_retryable_status, ClientError, Result};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Fixed-interval retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = max_retries + 1).
    pub max_retries: u32,
    /// Delay between attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, interval_seconds: u64) -> Self {
        Self {
            max_retries,
            interval: Duration::from_secs(interval_seconds),
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            interval: Duration::ZERO,
        }
    }
}

/// Execute a request, retrying transient failures according to `policy`.
///
/// A response whose status is in `accept` resolves the call. Transport errors,
/// 429 and 5xx responses are retried; any other status fails immediately.
pub async fn execute_with_retry(
    transport: &dyn Transport,
    request: &HttpRequest,
    policy: RetryPolicy,
    accept: &[StatusCode],
) -> Result<HttpResponse> {
    let mut attempts: u32 = 0;

    loop {
        let failure = match transport.execute(request).await {
            Ok(response) if accept.contains(&response.status) => return Ok(response),
            Ok(response) if is_retryable_status(response.status) => {
                ClientError::api(response.status, &response.body)
            }
            Ok(response) => return Err(ClientError::api(response.status, &response.body)),
            Err(e) => ClientError::Transport(e),
        };

        attempts += 1;
        if attempts > policy.max_retries {
            debug!(
                "{} {} failed after {} attempt(s)",
                request.method, request.url, attempts
            );
            return Err(ClientError::RetriesExhausted {
                limit: policy.max_retries,
                last: Box::new(failure),
            });
        }

        warn!(
            "{} {} failed ({}), retry {}/{} in {:?}",
            request.method, request.url, failure, attempts, policy.max_retries, policy.interval
        );
        tokio::time::sleep(policy.interval).await;
    }
}

/// Execute a request once, mapping any non-accepted status to an error.
pub async fn execute_once(
    transport: &dyn Transport,
    request: &HttpRequest,
    accept: &[StatusCode],
) -> Result<HttpResponse> {
    let response = transport.execute(request).await?;
    if accept.contains(&response.status) {
        Ok(response)
    } else {
        Err(ClientError::api(response.status, &response.body))
    }
}
