//! A filesystem location at which a copy of a book's content exists (§3.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Invariant: `(book_id, path)` is unique, and `path` alone is unique across
/// the whole system — a single filesystem path cannot belong to two books
/// (§3.3, §8 invariant #1). Enforced at the store layer; a violating insert
/// fails with [`crate::error::AppError::ConflictingPath`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePath {
    pub id: String,
    pub book_id: String,
    pub path: PathBuf,
    /// Flipped to `false` by the organizer when the file is moved away from
    /// this location (the row is kept, not deleted, so organize is
    /// reversible at the source-paths layer, §4.7 step 4).
    pub still_exists: bool,
    pub added_at: DateTime<Utc>,
    pub last_verified_at: DateTime<Utc>,
}

impl SourcePath {
    #[must_use]
    pub fn new(book_id: &str, path: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id: crate::ids::new_id(),
            book_id: book_id.to_string(),
            path,
            still_exists: true,
            added_at: now,
            last_verified_at: now,
        }
    }
}
