//! Error handling for the ABOP core engine

use thiserror::Error;

/// Central error type for the ABOP ingestion and reconciliation engine.
///
/// Each variant corresponds to one of the error kinds named in the design:
/// failures that threaten store consistency abort the owning operation,
/// while per-file/per-book errors are logged and the operation continues.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// `id` does not resolve to any known entity.
    #[error("not found: {entity} {id}")]
    NotFound {
        /// Entity type, e.g. "book", "operation".
        entity: String,
        /// The id that failed to resolve.
        id: String,
    },

    /// A `SourcePath` insert violated the path-uniqueness invariant (§3.3).
    #[error("path already claimed by another book: {path}")]
    ConflictingPath {
        /// The path that could not be (re-)claimed.
        path: String,
    },

    /// An organize plan would write two segments to the same destination.
    #[error("organize plan collision: {first} and {second} both map to {destination}")]
    DestinationCollision {
        /// First segment id in the collision.
        first: String,
        /// Second segment id in the collision.
        second: String,
        /// The destination path both segments mapped to.
        destination: String,
    },

    /// A requested state transition is not in the legal transition graph (§4.8).
    #[error("illegal state transition: {from} -> {to}")]
    IllegalStateTransition {
        /// The state the book was in.
        from: String,
        /// The state that was requested.
        to: String,
    },

    /// An input failed a validation constraint before being accepted.
    #[error("validation failed for {field}: {reason}")]
    ValidationError {
        /// Field that failed validation.
        field: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A metadata provider call failed; non-fatal, logged on the operation.
    #[error("provider '{name}' error: {cause}")]
    ProviderError {
        /// Stable provider name.
        name: String,
        /// Underlying cause, stringified.
        cause: String,
    },

    /// A file could not be read or written.
    #[error("I/O error at {path}: {cause}")]
    IoError {
        /// Path that was being operated on, if known.
        path: String,
        /// Underlying cause, stringified.
        cause: String,
    },

    /// Cooperative cancellation fired during an operation.
    #[error("operation cancelled")]
    Cancelled,

    /// A previously-running operation was terminated by a process restart.
    #[error("operation interrupted by restart")]
    Interrupted,

    /// Underlying `Store` capability failure.
    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Catch-all for errors that don't need a dedicated variant.
    #[error("{0}")]
    Other(String),
}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            path: String::new(),
            cause: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(format!("serialization error: {err}"))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Other(format!("TOML parse error: {err}"))
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Other(format!("TOML serialize error: {err}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Other(format!("task join error: {err}"))
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl AppError {
    /// Builds an [`AppError::IoError`] with the given path attached.
    #[must_use]
    pub fn io(path: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::IoError {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    /// Builds an [`AppError::NotFound`] for the given entity/id pair.
    #[must_use]
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Builds an [`AppError::ValidationError`].
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
