//! Error types for applecal operations.

use serde::Serialize;
use thiserror::Error;

/// Maximum number of characters of a response body kept in error values.
pub const BODY_EXCERPT_CHARS: usize = 200;

/// Errors that can occur in applecal operations.
#[derive(Error, Debug)]
pub enum AppleCalError {
    /// Bad input caught before any network activity.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A string could not be read as a date or date-time.
    #[error("Invalid date/time format: {0}")]
    Format(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// The resource changed on the server since it was fetched.
    #[error("Conflict: {url} was modified on the server (If-Match {etag} failed)")]
    Conflict { url: String, etag: String },

    #[error("Protocol error: {method} {url} returned {status}: {body}")]
    Protocol {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// A server response could be read but did not have the expected shape.
    #[error("Protocol error: {0}")]
    MalformedResponse(String),

    #[error("Transport error: {method} {url}: {message}")]
    Transport {
        method: String,
        url: String,
        message: String,
    },

    #[error("Attachment {managed_id} is still present on event {uid} after manual removal")]
    AttachmentState { uid: String, managed_id: String },

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for applecal operations.
pub type CalResult<T> = Result<T, AppleCalError>;

impl AppleCalError {
    /// Stable snake_case discriminator for rendering and inline records.
    pub fn kind(&self) -> &'static str {
        match self {
            AppleCalError::Validation(_) => "validation_error",
            AppleCalError::Format(_) => "format_error",
            AppleCalError::NotFound { .. } => "not_found_error",
            AppleCalError::Conflict { .. } => "conflict_error",
            AppleCalError::Protocol { .. } | AppleCalError::MalformedResponse(_) => {
                "protocol_error"
            }
            AppleCalError::Transport { .. } => "transport_error",
            AppleCalError::AttachmentState { .. } => "attachment_state_error",
            AppleCalError::Discovery(_) => "discovery_error",
            AppleCalError::Config(_) => "config_error",
            AppleCalError::Io(_) => "io_error",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppleCalError::Validation(message.into())
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        AppleCalError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Build a protocol error from a non-success response, truncating the body.
    pub fn protocol(method: &str, url: &str, status: u16, body: &str) -> Self {
        AppleCalError::Protocol {
            method: method.to_string(),
            url: url.to_string(),
            status,
            body: excerpt(body),
        }
    }

    /// Whether the error is a [`AppleCalError::Validation`] or format error.
    pub fn is_validation(&self) -> bool {
        matches!(self, AppleCalError::Validation(_) | AppleCalError::Format(_))
    }
}

/// A serializable snapshot of an error, used where a failure is recorded
/// inline instead of aborting the whole operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
}

impl From<&AppleCalError> for ErrorInfo {
    fn from(err: &AppleCalError) -> Self {
        ErrorInfo {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// First [`BODY_EXCERPT_CHARS`] characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str) -> String {
    match text.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
