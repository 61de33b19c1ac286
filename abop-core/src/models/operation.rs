//! Background job records, persisted by the [`crate::operations::OperationQueue`] (§4.10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kinds of job the queue can run (§4.10, §6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationKind {
    Scan { roots: Vec<String> },
    Organize { book_id: String },
    BulkFetchMetadata { book_ids: Vec<String>, refresh_all: bool },
    ImportFile { path: String },
    PurgeSoftDeleted,
    Restore { book_id: String },
}

impl OperationKind {
    /// Short name used in logs/events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Scan { .. } => "scan",
            Self::Organize { .. } => "organize",
            Self::BulkFetchMetadata { .. } => "bulk_fetch_metadata",
            Self::ImportFile { .. } => "import_file",
            Self::PurgeSoftDeleted => "purge_soft_deleted",
            Self::Restore { .. } => "restore",
        }
    }
}

/// Operation lifecycle status (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Progress snapshot for an in-flight operation (§4.10).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationProgress {
    pub current: u64,
    pub total: u64,
    pub message: String,
}

/// A persisted operation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub progress: OperationProgress,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Operation {
    #[must_use]
    pub fn new(kind: OperationKind) -> Self {
        Self {
            id: crate::ids::new_id(),
            kind,
            status: OperationStatus::Queued,
            progress: OperationProgress::default(),
            started_at: None,
            completed_at: None,
            error: None,
            created_at: Utc::now(),
        }
    }
}

/// Severity of a log record emitted by a running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One entry in an operation's persisted log (§4.10, `StreamOperationLogs`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub operation_id: String,
    pub sequence: u64,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
