//! Enforces the legal `LibraryState` transition graph (§4.8). Every path
//! that changes a book's `library_state` goes through [`transition`] rather
//! than assigning the field directly, so the graph stays the single source
//! of truth.

use crate::error::{AppError, Result};
use crate::models::{BlockedHash, Book, FileSegment, LibraryState};
use crate::repo;
use crate::store::Store;

/// Checks whether `from -> to` is a legal transition, independent of any
/// particular book (§4.8 graph).
#[must_use]
pub fn is_legal(from: LibraryState, to: LibraryState) -> bool {
    use LibraryState::{Deleted, Imported, Organized, Wanted};
    matches!(
        (from, to),
        (Wanted, Imported)
            | (Imported, Organized)
            | (Organized, Imported)
            | (_, Deleted)
            | (Deleted, Imported)
            | (Deleted, Organized)
    )
}

/// Moves `book_id` to `to`, rejecting the call if the transition isn't in
/// the graph.
///
/// # Errors
///
/// Returns [`AppError::IllegalStateTransition`] if `to` is not reachable
/// from the book's current state, or a store error on read/write failure.
pub fn transition(store: &dyn Store, book_id: &str, to: LibraryState) -> Result<Book> {
    let mut book = repo::require_book(store, book_id)?;
    if !is_legal(book.library_state, to) {
        return Err(AppError::IllegalStateTransition {
            from: book.library_state.as_str().to_string(),
            to: to.as_str().to_string(),
        });
    }
    book.library_state = to;
    book.touch();
    repo::put_book(store, &book)?;
    Ok(book)
}

/// Soft-deletes `book_id` (`any -> deleted`, §4.8). If `prevent_reimport` is
/// set, also blocks every active segment's content hash so the same file
/// can't re-enter the library, attaching `reason` (or a default) to the
/// blocked-hash record.
///
/// # Errors
///
/// Returns a store error on read/write failure. The transition itself is
/// always legal (`_ -> Deleted` matches any source state).
pub fn soft_delete(store: &dyn Store, book_id: &str, prevent_reimport: bool, reason: Option<&str>) -> Result<Book> {
    let mut book = repo::require_book(store, book_id)?;
    let previous_state = book.library_state;

    book.state_before_deletion = Some(previous_state);
    book.library_state = LibraryState::Deleted;
    book.marked_for_deletion = true;
    book.marked_for_deletion_at = Some(chrono::Utc::now());
    book.touch();
    repo::put_book(store, &book)?;

    if prevent_reimport {
        let reason = reason.unwrap_or("prevented on deletion");
        for segment in repo::list_segments_for_book(store, book_id)? {
            if segment.active {
                block_segment(store, &segment, reason)?;
            }
        }
    }

    Ok(book)
}

fn block_segment(store: &dyn Store, segment: &FileSegment, reason: &str) -> Result<()> {
    if repo::is_blocked(store, &segment.content_hash)?.is_some() {
        return Ok(());
    }
    let blocked = BlockedHash::new(&segment.content_hash, reason)?;
    repo::put_blocked_hash(store, &blocked)
}

/// Restores a soft-deleted book (`deleted -> imported|organized`, §4.8):
/// restores `state_before_deletion` if recorded, else falls back to
/// `imported`.
///
/// # Errors
///
/// Returns [`AppError::IllegalStateTransition`] if the book isn't currently
/// `Deleted`, or a store error on read/write failure.
pub fn restore(store: &dyn Store, book_id: &str) -> Result<Book> {
    let mut book = repo::require_book(store, book_id)?;
    if book.library_state != LibraryState::Deleted {
        return Err(AppError::IllegalStateTransition {
            from: book.library_state.as_str().to_string(),
            to: "restored".to_string(),
        });
    }

    let target = book.state_before_deletion.unwrap_or(LibraryState::Imported);
    book.library_state = target;
    book.marked_for_deletion = false;
    book.marked_for_deletion_at = None;
    book.state_before_deletion = None;
    book.touch();
    repo::put_book(store, &book)?;
    Ok(book)
}
