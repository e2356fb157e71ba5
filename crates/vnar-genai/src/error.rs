//! Error types for remote service calls.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for remote service operations.
pub type GenAiResult<T> = Result<T, GenAiError>;

/// Errors that can occur when talking to the generation or speech services.
#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Service returned empty response. Check API key / quota / safety settings. prompt_feedback={feedback}")]
    EmptyResponse { feedback: String },

    #[error("Service returned non-JSON response, preview: {preview}")]
    MalformedResponse { preview: String },

    #[error("Audio payload decode failed: {0}")]
    AudioDecode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{operation} failed after {attempts} attempts: {source}")]
    Exhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<GenAiError>,
    },
}

/// Number of characters of offending text included in malformed-response errors.
const PREVIEW_LEN: usize = 400;

impl GenAiError {
    /// Create an empty-response error carrying whatever diagnostic feedback
    /// the service attached.
    pub fn empty_response(feedback: impl Into<String>) -> Self {
        Self::EmptyResponse {
            feedback: feedback.into(),
        }
    }

    /// Create a malformed-response error with a bounded preview of the text.
    pub fn malformed_response(text: &str) -> Self {
        let preview: String = text.chars().take(PREVIEW_LEN).collect();
        Self::MalformedResponse { preview }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn exhausted(operation: impl Into<String>, attempts: u32, last: GenAiError) -> Self {
        Self::Exhausted {
            operation: operation.into(),
            attempts,
            source: Box::new(last),
        }
    }

    /// Check whether this error is worth retrying.
    ///
    /// Transport-level conditions are classified structurally; the textual
    /// scan at the end is a compatibility heuristic for errors that cross an
    /// opaque string boundary, not a guarantee.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenAiError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.is_body() || looks_transient(&e.to_string())
            }
            GenAiError::Status { status, body } => {
                *status == StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error()
                    || looks_transient(body)
            }
            // Empty or garbled generations tend to co-occur with service
            // instability, so they stay inside the retry budget.
            GenAiError::EmptyResponse { .. } | GenAiError::MalformedResponse { .. } => true,
            GenAiError::AudioDecode(_) => false,
            GenAiError::Config(_) => false,
            GenAiError::Exhausted { .. } => false,
        }
    }
}

/// Text markers that indicate a transient network or quota condition.
fn looks_transient(message: &str) -> bool {
    let msg = message.to_lowercase();
    [
        "connection",
        "timeout",
        "timed out",
        "protocol",
        "chunked",
        "429",
        "rate limit",
        "quota",
        "resource exhausted",
    ]
    .iter()
    .any(|marker| msg.contains(marker))
}
