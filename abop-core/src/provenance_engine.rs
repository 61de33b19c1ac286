//! The ProvenanceEngine (§4.4): the five store-backed operations over a
//! `(book_id, field)` pair. [`crate::models::provenance::FieldState`] holds
//! the actual slot logic; this module is the persistence wrapper around it.

use crate::error::Result;
use crate::models::provenance::FieldName;
use crate::repo;
use crate::store::Store;

fn with_field<F>(store: &dyn Store, book_id: &str, field: FieldName, mutate: F) -> Result<()>
where
    F: FnOnce(&mut crate::models::provenance::FieldState),
{
    let mut book = repo::require_book(store, book_id)?;
    mutate(book.fields.entry(field).or_default());
    book.refresh_title_cache();
    book.touch();
    repo::put_book(store, &book)
}

/// `SetFile` (§4.4): scanner writes a tag-derived value.
pub fn set_file(store: &dyn Store, book_id: &str, field: FieldName, value: Option<String>) -> Result<()> {
    with_field(store, book_id, field, |state| state.set_file(value))
}

/// `SetFetched` (§4.4): a provider result.
pub fn set_fetched(store: &dyn Store, book_id: &str, field: FieldName, value: Option<String>) -> Result<()> {
    with_field(store, book_id, field, |state| state.set_fetched(value))
}

/// `SetStored` (§4.4). Returns `false` if the field was locked and the
/// write was refused.
pub fn set_stored(store: &dyn Store, book_id: &str, field: FieldName, value: Option<String>) -> Result<bool> {
    let mut book = repo::require_book(store, book_id)?;
    let accepted = book.fields.entry(field).or_default().set_stored(value);
    book.refresh_title_cache();
    book.touch();
    repo::put_book(store, &book)?;
    Ok(accepted)
}

/// `SetOverride` (§4.4): always allowed.
pub fn set_override(store: &dyn Store, book_id: &str, field: FieldName, value: String) -> Result<()> {
    with_field(store, book_id, field, |state| state.set_override(value))
}

/// `ClearOverride` (§4.4).
pub fn clear_override(store: &dyn Store, book_id: &str, field: FieldName, unlock: bool) -> Result<()> {
    with_field(store, book_id, field, |state| state.clear_override(unlock))
}

/// `Lock` (§4.4).
pub fn set_locked(store: &dyn Store, book_id: &str, field: FieldName, locked: bool) -> Result<()> {
    with_field(store, book_id, field, |state| state.set_locked(locked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Book;
    use crate::store::MemoryStore;

    #[test]
    fn set_file_then_set_override_changes_effective_value() {
        let store = MemoryStore::default();
        let book = Book::new_wanted("Original Title");
        repo::put_book(&store, &book).unwrap();

        set_file(&store, &book.id, FieldName::Author, Some("Tag Author".into())).unwrap();
        let loaded = repo::require_book(&store, &book.id).unwrap();
        assert_eq!(loaded.effective(FieldName::Author).as_deref(), Some("Tag Author"));

        set_override(&store, &book.id, FieldName::Author, "Pinned Author".into()).unwrap();
        let loaded = repo::require_book(&store, &book.id).unwrap();
        assert_eq!(loaded.effective(FieldName::Author).as_deref(), Some("Pinned Author"));
    }

    #[test]
    fn set_stored_refused_when_locked() {
        let store = MemoryStore::default();
        let book = Book::new_wanted("Title");
        repo::put_book(&store, &book).unwrap();

        set_override(&store, &book.id, FieldName::Title, "Locked Title".into()).unwrap();
        set_locked(&store, &book.id, FieldName::Title, true).unwrap();

        let accepted = set_stored(&store, &book.id, FieldName::Title, Some("New Title".into())).unwrap();
        assert!(!accepted);

        let loaded = repo::require_book(&store, &book.id).unwrap();
        assert_eq!(loaded.effective(FieldName::Title).as_deref(), Some("Locked Title"));
    }
}
