//! Error types for image transformation.

use std::time::Duration;

/// Message shown when a failure carries no description of its own.
pub const FALLBACK_MESSAGE: &str = "Failed to generate image.";

/// Errors surfaced to callers of the encoder and the transformation client.
///
/// Transport failures never escape as-is: the client folds them into
/// [`RetouchError::Transformation`] with a human-readable message.
#[derive(Debug, thiserror::Error)]
pub enum RetouchError {
    /// Input rejected before any request was made (non-image file, empty prompt, bad base64).
    #[error("{0}")]
    InvalidInput(String),

    /// Local file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The model answered with text instead of an image.
    #[error("Model returned text instead of image: {0}")]
    ModelRefused(String),

    /// The call succeeded but produced nothing usable.
    #[error("{0}")]
    EmptyResponse(String),

    /// Transport, authentication or otherwise unexpected failure.
    #[error("{message}")]
    Transformation {
        /// Human-readable description.
        message: String,
    },
}

/// Discriminant of a [`RetouchError`], for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`RetouchError::InvalidInput`].
    InvalidInput,
    /// See [`RetouchError::Io`].
    Io,
    /// See [`RetouchError::ModelRefused`].
    ModelRefused,
    /// See [`RetouchError::EmptyResponse`].
    EmptyResponse,
    /// See [`RetouchError::Transformation`].
    Transformation,
}

impl RetouchError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Io(_) => ErrorKind::Io,
            Self::ModelRefused(_) => ErrorKind::ModelRefused,
            Self::EmptyResponse(_) => ErrorKind::EmptyResponse,
            Self::Transformation { .. } => ErrorKind::Transformation,
        }
    }

    /// Builds a transformation error, falling back to the generic message when `message` is blank.
    pub fn transformation(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            message
        };
        Self::Transformation { message }
    }

    /// The message a user interface should display.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Failures of the underlying transport.
///
/// Only visible to [`Transport`](crate::transform::Transport) implementors;
/// the client converts these into [`RetouchError::Transformation`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// API key missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error text extracted from the body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested delay from the `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else; may be empty.
    #[error("{0}")]
    Other(String),
}

impl From<TransportError> for RetouchError {
    fn from(err: TransportError) -> Self {
        RetouchError::transformation(err.to_string())
    }
}

/// Result type alias for transformation operations.
pub type Result<T> = std::result::Result<T, RetouchError>;

/// Parses the `Retry-After` header as a number of seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Extracts a readable message from an API error body.
///
/// Google APIs wrap errors as `{"error": {"message": ...}}`; anything else
/// is trimmed and truncated.
pub(crate) fn sanitize_error_message(body: &str) -> String {
    const MAX_LEN: usize = 500;

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.trim().to_string();
        }
    }

    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
