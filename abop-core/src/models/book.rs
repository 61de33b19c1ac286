//! The logical audiobook entity and its lifecycle state (§3.1).

use crate::models::provenance::{EffectiveValue, FieldName, FieldState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Lifecycle state of a [`Book`] (§3.1, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryState {
    /// The user wants this book but no file has matched it yet.
    Wanted,
    /// At least one file has been ingested but not yet organized.
    Imported,
    /// The organizer has moved/linked the book's files into canonical layout.
    Organized,
    /// Soft-deleted; hidden from normal listings, restorable.
    Deleted,
}

impl LibraryState {
    /// Short machine-readable name, used in events and API responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wanted => "wanted",
            Self::Imported => "imported",
            Self::Organized => "organized",
            Self::Deleted => "deleted",
        }
    }
}

/// A logical audiobook: one title, possibly many physical copies.
///
/// Invariants (§3.1): `library_state == Wanted` iff there are zero active
/// source paths; `marked_for_deletion` iff `library_state == Deleted`;
/// `normalized_title` is a pure function of `title`; each tracked field has
/// exactly one effective value, computed from `fields` by
/// [`FieldState::effective`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    /// Stable, time-sortable id.
    pub id: String,
    /// Raw title as stored (the effective value of the `Title` field, kept
    /// denormalized here for convenience; `fields` remains authoritative).
    pub title: String,
    /// Lowercase, punctuation-stripped, whitespace-collapsed form of `title`.
    pub normalized_title: String,
    /// Owning author, if known.
    pub author_id: Option<String>,
    /// Owning series, if known.
    pub series_id: Option<String>,
    /// Position within the series, if known.
    pub series_position: Option<f64>,
    /// Work grouping editions/narrations of the same title, if known.
    pub work_id: Option<String>,
    /// Lifecycle state.
    pub library_state: LibraryState,
    /// Set when `library_state == Deleted`.
    pub marked_for_deletion: bool,
    /// When the book was soft-deleted, if it was.
    pub marked_for_deletion_at: Option<DateTime<Utc>>,
    /// The library state this book was in before being soft-deleted, used
    /// by `RestoreBook` when no better information is available.
    pub state_before_deletion: Option<LibraryState>,
    /// Free-form tags.
    pub tags: HashSet<String>,
    /// Per-field provenance state (§3.6). Keyed by field name so the map is
    /// stable across serialization and easy to look up without a `match`.
    pub fields: BTreeMap<FieldName, FieldState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Creates a brand-new book in the `Wanted` state, as produced by
    /// `AddWanted` (§3.7) — no source paths yet.
    #[must_use]
    pub fn new_wanted(title: &str) -> Self {
        let now = Utc::now();
        let mut book = Self {
            id: crate::ids::new_id(),
            title: title.to_string(),
            normalized_title: normalize_title(title),
            author_id: None,
            series_id: None,
            series_position: None,
            work_id: None,
            library_state: LibraryState::Wanted,
            marked_for_deletion: false,
            marked_for_deletion_at: None,
            state_before_deletion: None,
            tags: HashSet::new(),
            fields: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        };
        book.fields
            .entry(FieldName::Title)
            .or_default()
            .stored_value = Some(title.to_string());
        book
    }

    /// Creates a brand-new book discovered by the scanner, starting in the
    /// `Imported` state (the caller is responsible for attaching the first
    /// `SourcePath`/`FileSegment` in the same transaction, per §3.7).
    #[must_use]
    pub fn new_imported(title: &str) -> Self {
        let mut book = Self::new_wanted(title);
        book.library_state = LibraryState::Imported;
        book
    }

    /// Recomputes `title`/`normalized_title` from the `Title` field's
    /// current effective value, falling back to the existing title if the
    /// field has no value at all (it never should, but the type can't
    /// prove it).
    pub fn refresh_title_cache(&mut self) {
        if let Some(state) = self.fields.get(&FieldName::Title) {
            if let EffectiveValue::Present(value) = state.effective() {
                self.title = value;
                self.normalized_title = normalize_title(&self.title);
            }
        }
    }

    /// Marks the book updated just now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Effective value of a tracked field, or `None` if every slot is empty.
    #[must_use]
    pub fn effective(&self, field: FieldName) -> Option<String> {
        self.fields
            .get(&field)
            .and_then(|s| s.effective().into_option())
    }
}

/// Lowercases, strips punctuation, and collapses whitespace. Pure function
/// of its input, matching the §3.1 invariant on `normalized_title`.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let mut normalized = String::with_capacity(title.len());
    let mut last_was_space = true; // swallow leading whitespace
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            normalized.extend(ch.to_lowercase());
            last_was_space = false;
        } else if ch.is_whitespace() {
            if !last_was_space {
                normalized.push(' ');
                last_was_space = true;
            }
        }
        // other punctuation is stripped entirely
    }
    normalized.truncate(normalized.trim_end().len());
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_wanted_book_has_no_source_paths_by_construction() {
        let book = Book::new_wanted("Neural Wraith");
        assert_eq!(book.library_state, LibraryState::Wanted);
        assert!(!book.marked_for_deletion);
    }

    #[test]
    fn normalize_title_strips_punctuation_and_collapses_whitespace() {
        assert_eq!(normalize_title("  The  Hobbit!!  "), "the hobbit");
        assert_eq!(normalize_title("J.K. Rowling's Tale"), "jk rowlings tale");
        assert_eq!(normalize_title(""), "");
    }

    #[test]
    fn normalize_title_is_pure() {
        let a = normalize_title("Dune: Part Two");
        let b = normalize_title("Dune: Part Two");
        assert_eq!(a, b);
    }
}
