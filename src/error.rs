//! Error types for client operations.

use reqwest::StatusCode;
use thiserror::Error;

use crate::transport::TransportError;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the annotation store.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network-level failure (connection refused, timeout, reset).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Server answered with a status the operation does not accept.
    #[error("HTTP {status}: {message}")]
    Api { status: StatusCode, message: String },
    /// Every attempt of a retried request failed.
    #[error("request failed after {limit} retries: {last}")]
    RetriesExhausted {
        limit: u32,
        #[source]
        last: Box<ClientError>,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Operation needs an API token and the client has none.
    #[error("an API token is required to {0}")]
    MissingCredential(&'static str),
    /// Created annotations never showed up in search after all re-submissions.
    #[error("{unconfirmed} annotation(s) could not be confirmed after {attempts} re-submission(s)")]
    InconsistentWrite { unconfirmed: usize, attempts: u32 },
    #[error("{failed} of {submitted} annotation(s) could not be created: {source}")]
    SomeAnnotationsFailed {
        failed: usize,
        submitted: usize,
        #[source]
        source: Box<ClientError>,
    },
    /// The search used to confirm created annotations failed.
    #[error("unable to verify created annotations: {0}")]
    VerificationFailed(#[source] Box<ClientError>),
    #[error("unable to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Build an API error from a status and raw response body.
    pub fn api(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("reason").and_then(|r| r.as_str()).map(str::to_string))
            .unwrap_or_else(|| truncate(body, 200).to_string());
        ClientError::Api { status, message }
    }

    /// Whether this error is a transient failure worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Api { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Status codes that indicate a transient server-side condition.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
