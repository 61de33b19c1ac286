//! JSON output structures for ABOP CLI
//!
//! This module provides structured output formats for machine consumption.
//! All output structures are designed to be stable and backwards-compatible.

use abop_core::models::provenance::EffectiveSource;
use abop_core::{Author, BlockedHash, Book, Operation, Page, Series};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level JSON output structure for all CLI operations
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum CliOutput {
    /// Successful operation result
    #[serde(rename = "success")]
    Success { data: OutputData },
    /// Error result
    #[serde(rename = "error")]
    Error { error: ErrorOutput },
}

/// Data payload for successful operations
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "operation")]
pub enum OutputData {
    /// A single book
    #[serde(rename = "book")]
    Book(BookInfo),
    /// A page of books
    #[serde(rename = "book_list")]
    BookList(PageInfo<BookInfo>),
    /// Ids created by `AddWanted`
    #[serde(rename = "wanted")]
    Wanted { ids: Vec<String> },
    /// An operation id returned by a queued verb
    #[serde(rename = "operation_started")]
    OperationStarted { operation_id: String },
    /// A single operation's status
    #[serde(rename = "operation")]
    Operation(OperationInfo),
    /// A page of blocked hashes
    #[serde(rename = "blocked_hash_list")]
    BlockedHashList(PageInfo<BlockedHashInfo>),
    /// A directory listing
    #[serde(rename = "browse")]
    Browse(Vec<FilesystemEntryInfo>),
    /// A bare acknowledgement, for verbs with no interesting payload
    #[serde(rename = "ok")]
    Ok,
}

/// A page of results, mirroring [`abop_core::Page`].
#[derive(Debug, Serialize, Deserialize)]
pub struct PageInfo<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<T, U: From<T>> From<Page<T>> for PageInfo<U> {
    fn from(page: Page<T>) -> Self {
        Self {
            items: page.items.into_iter().map(U::from).collect(),
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

/// Book information for JSON output, with every tracked field's effective
/// value and the provenance slot it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookInfo {
    pub id: String,
    pub title: String,
    pub library_state: String,
    pub author_id: Option<String>,
    pub series_id: Option<String>,
    pub series_position: Option<f64>,
    pub tags: Vec<String>,
    pub fields: BTreeMap<String, FieldInfo>,
    pub created_at: String,
    pub updated_at: String,
}

/// One tracked field's effective value and source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub value: Option<String>,
    pub source: String,
}

impl From<Book> for BookInfo {
    fn from(book: Book) -> Self {
        let fields = book
            .fields
            .iter()
            .map(|(name, state)| {
                let key = format!("{name:?}").to_lowercase();
                let info = FieldInfo {
                    value: state.effective().into_option(),
                    source: effective_source_str(state.effective_source()).to_string(),
                };
                (key, info)
            })
            .collect();
        Self {
            id: book.id,
            title: book.title,
            library_state: book.library_state.as_str().to_string(),
            author_id: book.author_id,
            series_id: book.series_id,
            series_position: book.series_position,
            tags: book.tags.into_iter().collect(),
            fields,
            created_at: book.created_at.to_rfc3339(),
            updated_at: book.updated_at.to_rfc3339(),
        }
    }
}

fn effective_source_str(source: EffectiveSource) -> &'static str {
    match source {
        EffectiveSource::Override => "override",
        EffectiveSource::Stored => "stored",
        EffectiveSource::Fetched => "fetched",
        EffectiveSource::File => "file",
        EffectiveSource::None => "none",
    }
}

/// Author information for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub id: String,
    pub name: String,
    pub wanted: bool,
}

impl From<Author> for AuthorInfo {
    fn from(author: Author) -> Self {
        Self { id: author.id, name: author.name, wanted: author.wanted }
    }
}

/// Series information for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesInfo {
    pub id: String,
    pub title: String,
    pub author_id: Option<String>,
    pub wanted: bool,
}

impl From<Series> for SeriesInfo {
    fn from(series: Series) -> Self {
        Self { id: series.id, title: series.title, author_id: series.author_id, wanted: series.wanted }
    }
}

/// Operation status information for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationInfo {
    pub id: String,
    pub kind: String,
    pub status: String,
    pub progress_current: u64,
    pub progress_total: u64,
    pub progress_message: String,
    pub error: Option<String>,
}

impl From<Operation> for OperationInfo {
    fn from(operation: Operation) -> Self {
        Self {
            id: operation.id,
            kind: operation.kind.label().to_string(),
            status: format!("{:?}", operation.status).to_lowercase(),
            progress_current: operation.progress.current,
            progress_total: operation.progress.total,
            progress_message: operation.progress.message,
            error: operation.error,
        }
    }
}

/// Blocked-hash information for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedHashInfo {
    pub hash: String,
    pub reason: String,
    pub blocked_at: String,
}

impl From<BlockedHash> for BlockedHashInfo {
    fn from(blocked: BlockedHash) -> Self {
        Self { hash: blocked.hash, reason: blocked.reason, blocked_at: blocked.blocked_at.to_rfc3339() }
    }
}

/// One filesystem entry returned by `browse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemEntryInfo {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub size_bytes: Option<u64>,
    pub readonly: bool,
    pub is_audio_file: bool,
    pub excluded: bool,
}

impl From<abop_core::engine::FilesystemEntry> for FilesystemEntryInfo {
    fn from(entry: abop_core::engine::FilesystemEntry) -> Self {
        Self {
            name: entry.name,
            path: entry.path,
            is_dir: entry.is_dir,
            size_bytes: entry.size_bytes,
            readonly: entry.readonly,
            is_audio_file: entry.is_audio_file,
            excluded: entry.excluded,
        }
    }
}

/// Error output structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOutput {
    pub message: String,
    pub error_type: String,
}

impl CliOutput {
    #[must_use]
    pub fn book(book: Book) -> Self {
        Self::Success { data: OutputData::Book(book.into()) }
    }

    #[must_use]
    pub fn book_list(page: Page<Book>) -> Self {
        Self::Success { data: OutputData::BookList(page.into()) }
    }

    #[must_use]
    pub fn wanted(ids: Vec<String>) -> Self {
        Self::Success { data: OutputData::Wanted { ids } }
    }

    #[must_use]
    pub fn operation_started(operation_id: String) -> Self {
        Self::Success { data: OutputData::OperationStarted { operation_id } }
    }

    #[must_use]
    pub fn operation(operation: Operation) -> Self {
        Self::Success { data: OutputData::Operation(operation.into()) }
    }

    #[must_use]
    pub fn blocked_hash_list(page: Page<BlockedHash>) -> Self {
        Self::Success { data: OutputData::BlockedHashList(page.into()) }
    }

    #[must_use]
    pub fn browse(entries: Vec<abop_core::engine::FilesystemEntry>) -> Self {
        Self::Success { data: OutputData::Browse(entries.into_iter().map(Into::into).collect()) }
    }

    #[must_use]
    pub fn ok() -> Self {
        Self::Success { data: OutputData::Ok }
    }

    /// Create an error result
    #[must_use]
    pub fn error(message: String, error_type: String) -> Self {
        Self::Error { error: ErrorOutput { message, error_type } }
    }

    /// Serialize to JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized (never happens
    /// for the types this module defines).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abop_core::Book;

    #[test]
    fn book_output_serializes_effective_fields() {
        let book = Book::new_imported("Neural Wraith");
        let output = CliOutput::book(book);
        let json = output.to_json().expect("serializes");
        assert!(json.contains("\"status\": \"success\""));
        assert!(json.contains("Neural Wraith"));
    }

    #[test]
    fn error_output_serializes() {
        let output = CliOutput::error("boom".to_string(), "AppError".to_string());
        let json = output.to_json().expect("serializes");
        assert!(json.contains("\"status\": \"error\""));
        assert!(json.contains("boom"));
    }
}
