//! PurgeScheduler (§4.12): periodically enqueues `purge` operations for
//! books past the soft-delete retention window, and the purge operation
//! itself (§4.8 "irreversible").

use crate::constants::{DEFAULT_PURGE_INTERVAL_SECONDS, DEFAULT_PURGE_RETENTION_DAYS};
use crate::error::Result;
use crate::models::{LibraryState, OperationKind};
use crate::operations::OperationQueue;
use crate::repo;
use crate::store::{Store, keys};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Wakes on `interval` (default [`DEFAULT_PURGE_INTERVAL_SECONDS`]) and
/// enqueues one `purge_soft_deleted` operation whenever at least one book
/// is past `retention_days` (default [`DEFAULT_PURGE_RETENTION_DAYS`]).
pub struct PurgeScheduler {
    store: Arc<dyn Store>,
    queue: OperationQueue,
    interval: Duration,
    retention_days: i64,
}

impl PurgeScheduler {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, queue: OperationQueue) -> Self {
        Self {
            store,
            queue,
            interval: Duration::from_secs(DEFAULT_PURGE_INTERVAL_SECONDS),
            retention_days: DEFAULT_PURGE_RETENTION_DAYS,
        }
    }

    #[must_use]
    pub fn with_schedule(store: Arc<dyn Store>, queue: OperationQueue, interval: Duration, retention_days: i64) -> Self {
        Self { store, queue, interval, retention_days }
    }

    /// Runs forever, waking on `interval`. Intended to be spawned as a
    /// background task.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            match self.tick() {
                Ok(true) => info!("purge scheduler enqueued a purge operation"),
                Ok(false) => {}
                Err(err) => tracing::error!(%err, "purge scheduler failed to inspect the library"),
            }
        }
    }

    /// Checks for books past retention and submits a purge operation if
    /// any exist. Returns whether one was submitted.
    ///
    /// # Errors
    ///
    /// Returns a store error on read/write failure.
    pub fn tick(&self) -> Result<bool> {
        if due_for_purge(&*self.store, self.retention_days)?.is_empty() {
            return Ok(false);
        }
        self.queue.submit(OperationKind::PurgeSoftDeleted)?;
        Ok(true)
    }
}

/// Lists books eligible for purge: `marked_for_deletion` and past
/// `retention_days` since `marked_for_deletion_at`.
///
/// # Errors
///
/// Returns a store error on read failure.
pub fn due_for_purge(store: &dyn Store, retention_days: i64) -> Result<Vec<crate::models::Book>> {
    let cutoff = Utc::now() - ChronoDuration::days(retention_days);
    Ok(repo::list_books(store)?
        .into_iter()
        .filter(|b| {
            b.marked_for_deletion
                && b.marked_for_deletion_at.is_some_and(|at| at < cutoff)
        })
        .collect())
}

/// Permanently removes every book due for purge: its record, segments, and
/// source paths, and (if `delete_files`) the underlying files on disk.
/// Blocked hashes are untouched (§4.8, §4.12).
///
/// # Errors
///
/// Returns a store error if a read/write fails; a file I/O error for one
/// book does not stop the rest (logged and skipped, matching the scanner's
/// per-item isolation).
pub fn purge_due_books(store: &dyn Store, retention_days: i64, delete_files: bool) -> Result<usize> {
    let mut purged = 0;
    for book in due_for_purge(store, retention_days)? {
        if book.library_state != LibraryState::Deleted {
            continue;
        }
        let segments = repo::list_segments_for_book(store, &book.id)?;
        if delete_files {
            for segment in &segments {
                if let Err(err) = std::fs::remove_file(&segment.path) {
                    tracing::warn!(book_id = %book.id, path = %segment.path.display(), %err, "failed to delete file during purge");
                }
            }
        }
        for segment in &segments {
            store.delete(&keys::segment(&segment.id))?;
            store.delete(&keys::segment_by_hash(&segment.content_hash))?;
        }
        for source_path in repo::list_source_paths_for_book(store, &book.id)? {
            store.delete(&keys::source_path(&source_path.id))?;
            store.delete(&keys::book_by_path(&source_path.path.to_string_lossy()))?;
        }
        store.delete(&keys::book(&book.id))?;
        purged += 1;
    }
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Book;
    use crate::store::MemoryStore;
    use std::path::PathBuf;

    fn overdue_deleted_book(days_ago: i64) -> Book {
        let mut book = Book::new_imported("Gone");
        book.library_state = LibraryState::Deleted;
        book.marked_for_deletion = true;
        book.marked_for_deletion_at = Some(Utc::now() - ChronoDuration::days(days_ago));
        book
    }

    #[test]
    fn a_book_past_retention_is_due_for_purge() {
        let store = MemoryStore::default();
        let book = overdue_deleted_book(45);
        repo::put_book(&store, &book).unwrap();

        let due = due_for_purge(&store, 30).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, book.id);
    }

    #[test]
    fn a_recently_deleted_book_is_not_due_yet() {
        let store = MemoryStore::default();
        let book = overdue_deleted_book(5);
        repo::put_book(&store, &book).unwrap();

        assert!(due_for_purge(&store, 30).unwrap().is_empty());
    }

    #[test]
    fn purging_removes_the_book_and_its_segments_but_keeps_blocked_hashes() {
        let store = MemoryStore::default();
        let book = overdue_deleted_book(45);
        repo::put_book(&store, &book).unwrap();
        let segment = crate::models::FileSegment::new(
            &book.id,
            PathBuf::from("/library/gone.mp3"),
            "mp3".to_string(),
            10,
            "c".repeat(64),
        );
        repo::insert_segment(&store, &segment).unwrap();
        let blocked = crate::models::BlockedHash::new(&"d".repeat(64), "unrelated").unwrap();
        repo::put_blocked_hash(&store, &blocked).unwrap();

        let purged = purge_due_books(&store, 30, false).unwrap();
        assert_eq!(purged, 1);
        assert!(repo::get_book(&store, &book.id).unwrap().is_none());
        assert!(repo::get_segment(&store, &segment.id).unwrap().is_none());
        assert!(repo::is_blocked(&store, &blocked.hash).unwrap().is_some());
    }
}
