//! Error types for the key/value storage capability.

use thiserror::Error;

/// Errors produced by a [`super::Store`] implementation.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("backing store error: {0}")]
    Backend(String),

    #[error("migration failed: version {version} - {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("lock timeout after {timeout_ms}ms")]
    LockTimeout { timeout_ms: u64 },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    #[must_use]
    pub fn backend(message: impl std::fmt::Display) -> Self {
        Self::Backend(message.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        Self::ConnectionFailed(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_key() {
        let err = StoreError::NotFound("book:abc".to_string());
        assert_eq!(err.to_string(), "key not found: book:abc");
    }
}
