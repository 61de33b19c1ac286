//! Typed domain events published on the [`crate::events::EventBus`] (§4.11).

use serde::{Deserialize, Serialize};

/// Every event kind the engine publishes. The transport layer (out of
/// scope here, §1) fans these out to connected clients over SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    BookCreated { book_id: String },
    BookUpdated { book_id: String },
    BookDeleted { book_id: String },
    BookRestored { book_id: String },
    SegmentAdded { book_id: String, segment_id: String },
    OperationStarted { operation_id: String },
    OperationProgress { operation_id: String, current: u64, total: u64, message: String },
    OperationCompleted { operation_id: String },
    OperationFailed { operation_id: String, error: String },
    OperationCancelled { operation_id: String },
    DedupDuplicateExactPath { book_id: String, path: String },
    DedupDuplicateNewPath { book_id: String, path: String },
    DedupWantedMatched { book_id: String, path: String },
    DedupBlocked { hash: String, path: String },
    MetadataUpdated { book_id: String, affected_fields: Vec<String> },
}

impl DomainEvent {
    /// The `kind` string as it appears in the API/SSE surface, e.g.
    /// `"book.created"`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BookCreated { .. } => "book.created",
            Self::BookUpdated { .. } => "book.updated",
            Self::BookDeleted { .. } => "book.deleted",
            Self::BookRestored { .. } => "book.restored",
            Self::SegmentAdded { .. } => "segment.added",
            Self::OperationStarted { .. } => "operation.started",
            Self::OperationProgress { .. } => "operation.progress",
            Self::OperationCompleted { .. } => "operation.completed",
            Self::OperationFailed { .. } => "operation.failed",
            Self::OperationCancelled { .. } => "operation.cancelled",
            Self::DedupDuplicateExactPath { .. } => "dedup.duplicate_exact_path",
            Self::DedupDuplicateNewPath { .. } => "dedup.duplicate_new_path",
            Self::DedupWantedMatched { .. } => "dedup.wanted_matched",
            Self::DedupBlocked { .. } => "dedup.blocked",
            Self::MetadataUpdated { .. } => "metadata.updated",
        }
    }
}
