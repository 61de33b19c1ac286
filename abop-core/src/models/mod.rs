//! Data model for the ingestion and reconciliation engine (§3).
//!
//! `Book` is the hub; `SourcePath`, `FileSegment`, and per-field
//! provenance state are owned by it. `Author`, `Series`, and `Work` are
//! shared by reference (§9 "Cyclic graphs" — everything is modeled by id,
//! there are no bidirectional strong references).

pub mod author;
pub mod blocked_hash;
pub mod book;
pub mod events;
pub mod file_segment;
pub mod operation;
pub mod pagination;
pub mod progress;
pub mod provenance;
pub mod series;
pub mod source_path;
pub mod work;

pub use author::Author;
pub use blocked_hash::BlockedHash;
pub use book::{Book, LibraryState};
pub use events::DomainEvent;
pub use file_segment::FileSegment;
pub use operation::{
    LogLevel, LogRecord, Operation, OperationKind, OperationProgress, OperationStatus,
};
pub use pagination::{Page, PageRequest};
pub use progress::Progress;
pub use provenance::{EffectiveSource, EffectiveValue, FieldName, FieldState};
pub use series::Series;
pub use source_path::SourcePath;
pub use work::Work;
