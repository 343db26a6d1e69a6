//! Error types for revive-state crate.

use thiserror::Error;

/// Errors raised by state persistence.
#[derive(Debug, Error)]
pub enum StateError {
    /// Reading or writing the state file failed.
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The state file exists but does not contain a device map.
    #[error("state file is corrupt: {0}")]
    Corrupt(String),

    /// The in-memory map could not be serialized.
    #[error("state serialization failed: {0}")]
    Serialization(String),

    /// A lock guarding in-memory persistence was poisoned.
    #[error("state lock poisoned")]
    LockPoisoned,
}

/// Result type for state operations.
pub type StateResult<T> = Result<T, StateError>;
