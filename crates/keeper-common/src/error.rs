//! Error types for photo keeper services.

use thiserror::Error;

/// Result type alias using KeeperError.
pub type KeeperResult<T> = Result<T, KeeperError>;

/// Primary error type for photo keeper operations.
#[derive(Debug, Error)]
pub enum KeeperError {
    // === Protocol Errors ===
    #[error("Datagram is not valid UTF-8")]
    InvalidEncoding,

    #[error("Datagram of {len} bytes exceeds the {max} byte limit")]
    Oversized { len: usize, max: usize },

    #[error("Expected at least {expected} fields, found {found}")]
    MissingFields { expected: usize, found: usize },

    #[error("Invalid value for '{field}': {message}")]
    InvalidField { field: &'static str, message: String },

    // === Storage Errors ===
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl KeeperError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        KeeperError::InvalidField {
            field,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for KeeperError {
    fn from(err: std::io::Error) -> Self {
        KeeperError::StorageError(err.to_string())
    }
}
