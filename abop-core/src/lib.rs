//! abop-core - ingestion and reconciliation engine for a self-hosted
//! audiobook library.
//!
//! This crate owns the data model, the scanner/dedup/resolution pipeline,
//! the persisted operation queue, and the [`engine`] facade that a host
//! binary (CLI, daemon, GUI) drives. Nothing in here talks to a terminal or
//! a UI toolkit.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod capabilities;
pub mod config;
pub mod constants;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod events;
pub mod filename_parser;
pub mod hash;
pub mod ids;
pub mod merge;
pub mod models;
pub mod operations;
pub mod organizer;
pub mod provenance_engine;
pub mod purge;
pub mod repo;
pub mod resolution;
pub mod scanner;
pub mod state_machine;
pub mod store;
pub mod watcher;

#[cfg(test)]
pub mod test_support;

// Re-exports from the engine facade — the surface a host binary drives.
pub use engine::{BookFilter, BookUpdate, Engine, FieldUpdate, ImportOptions, WantedKind};

// Re-exports from config
pub use config::Config;

// Re-exports from error
pub use error::{AppError, Result};

// Re-exports from models
pub use models::{Author, Book, DomainEvent, LibraryState, Operation, OperationKind, Page, PageRequest, Series};

// Re-exports from store
pub use store::{MemoryStore, SqliteStore, Store};

/// Convenient imports for a host binary driving the engine.
pub mod prelude {
    pub use crate::{
        config::Config,
        engine::{BookFilter, BookUpdate, Engine, FieldUpdate, ImportOptions, WantedKind},
        error::{AppError, Result},
        models::{Author, Book, DomainEvent, LibraryState, Operation, OperationKind, Page, PageRequest, Series},
        store::{MemoryStore, SqliteStore, Store},
    };
    pub use tracing::{debug, error, info, trace, warn};
}
