//! Error types for revive-remediation crate.

use thiserror::Error;

/// Errors raised while talking to the platform or running the poller.
#[derive(Debug, Error)]
pub enum RemediationError {
    /// Transport-level HTTP failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-success status.
    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The platform answered with a body we could not interpret.
    #[error("malformed response for {operation}: {reason}")]
    MalformedResponse {
        operation: &'static str,
        reason: String,
    },

    /// An operation exceeded its deadline.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// The refresh command could not be started.
    #[error("refresh command failed to start: {0}")]
    Command(#[from] std::io::Error),

    /// The refresh command line is empty.
    #[error("invalid refresh command: {0}")]
    InvalidCommand(String),

    /// An identifier that cannot stand alone as a URL path segment.
    #[error("invalid identifier for URL path: {0:?}")]
    InvalidIdentifier(String),

    /// Client construction failed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A call with no safe fallback failed.
    #[error("remote call failed during {operation}: {reason}")]
    RemoteCallFailed {
        operation: &'static str,
        reason: String,
    },
}

/// Result type for remediation operations.
pub type RemediationResult<T> = Result<T, RemediationError>;
