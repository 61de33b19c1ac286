//! Physical media backing a book (§3.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One physical audio file. `content_hash` is unique among *active*
/// segments (§8 invariant #2); an inactive segment (superseded by a merge,
/// §4.9) may share a hash with its successor because its content hasn't
/// changed, only its `active` status has.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSegment {
    pub id: String,
    pub book_id: String,
    pub path: PathBuf,
    pub format: String,
    pub size_bytes: u64,
    pub duration_seconds: Option<f64>,
    /// SHA-256 hex digest of the file's bytes (§4.1).
    pub content_hash: String,
    pub track_number: Option<u32>,
    pub total_tracks: Option<u32>,
    pub active: bool,
    /// Set when a merge (§4.9) replaces this segment with a combined one.
    pub superseded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FileSegment {
    #[must_use]
    pub fn new(book_id: &str, path: PathBuf, format: String, size_bytes: u64, content_hash: String) -> Self {
        Self {
            id: crate::ids::new_id(),
            book_id: book_id.to_string(),
            path,
            format,
            size_bytes,
            duration_seconds: None,
            content_hash,
            track_number: None,
            total_tracks: None,
            active: true,
            superseded_by: None,
            created_at: Utc::now(),
        }
    }
}
