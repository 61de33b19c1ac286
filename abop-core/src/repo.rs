//! Store-backed CRUD for the model layer (§3). Every multi-key write here
//! goes through a single [`crate::store::Store::batch`] call so a book, its
//! source paths, and its segments stay consistent (§5 "Shared resources").

use crate::error::{AppError, Result};
use crate::models::{
    Author, BlockedHash, Book, FileSegment, LogLevel, LogRecord, Operation, Progress, Series,
    SourcePath, Work,
};
use crate::store::{BatchOp, Store, keys};
use std::path::Path;

#[must_use]
pub fn get_book(store: &dyn Store, id: &str) -> Result<Option<Book>> {
    Ok(store.get_json(&keys::book(id))?)
}

pub fn require_book(store: &dyn Store, id: &str) -> Result<Book> {
    get_book(store, id)?.ok_or_else(|| AppError::not_found("book", id))
}

pub fn put_book(store: &dyn Store, book: &Book) -> Result<()> {
    Ok(store.put_json(&keys::book(&book.id), book)?)
}

#[must_use]
pub fn list_books(store: &dyn Store) -> Result<Vec<Book>> {
    Ok(store.scan_prefix_json(keys::BOOK)?)
}

/// Looks up the source path record for an exact filesystem path, using the
/// `book_by_path` secondary index (which stores the owning `SourcePath`'s
/// id, not a book id — the name matches the key prefix the index lives
/// under, §3.3).
#[must_use]
pub fn get_source_path_by_path(store: &dyn Store, path: &Path) -> Result<Option<SourcePath>> {
    let path_str = path.to_string_lossy();
    let Some(id) = store.get_json::<String>(&keys::book_by_path(&path_str))? else {
        return Ok(None);
    };
    get_source_path_inner(store, &id)
}

/// Inserts a new source path, enforcing the path-uniqueness invariant
/// (§3.3, §8 invariant #1).
///
/// # Errors
///
/// Returns [`AppError::ConflictingPath`] if `path` already belongs to a
/// different book.
pub fn insert_source_path(store: &dyn Store, source_path: &SourcePath) -> Result<()> {
    let path_str = source_path.path.to_string_lossy().into_owned();
    let path_key = keys::book_by_path(&path_str);
    if let Some(existing_id) = store.get_json::<String>(&path_key)? {
        if let Some(existing) = get_source_path_inner(store, &existing_id)? {
            if existing.book_id != source_path.book_id {
                return Err(AppError::ConflictingPath { path: path_str });
            }
        }
    }

    store.batch(vec![
        BatchOp::put(
            keys::source_path(&source_path.id),
            serde_json::to_vec(source_path)?,
        ),
        BatchOp::put(path_key, serde_json::to_vec(&source_path.id)?),
        BatchOp::put(
            keys::source_path_by_book(&source_path.book_id, &source_path.id),
            serde_json::to_vec(&source_path.id)?,
        ),
    ])?;
    Ok(())
}

fn get_source_path_inner(store: &dyn Store, id: &str) -> Result<Option<SourcePath>> {
    Ok(store.get_json(&keys::source_path(id))?)
}

pub fn put_source_path(store: &dyn Store, source_path: &SourcePath) -> Result<()> {
    Ok(store.put_json(&keys::source_path(&source_path.id), source_path)?)
}

#[must_use]
pub fn list_source_paths_for_book(store: &dyn Store, book_id: &str) -> Result<Vec<SourcePath>> {
    let ids: Vec<String> = store.scan_prefix_json(&keys::source_path_by_book_prefix(book_id))?;
    ids.into_iter()
        .filter_map(|id| get_source_path_inner(store, &id).transpose())
        .collect()
}

pub fn insert_segment(store: &dyn Store, segment: &FileSegment) -> Result<()> {
    store.batch(vec![
        BatchOp::put(keys::segment(&segment.id), serde_json::to_vec(segment)?),
        BatchOp::put(
            keys::segment_by_book(&segment.book_id, &segment.id),
            serde_json::to_vec(&segment.id)?,
        ),
        BatchOp::put(
            keys::segment_by_hash(&segment.content_hash),
            serde_json::to_vec(&segment.id)?,
        ),
    ])?;
    Ok(())
}

pub fn put_segment(store: &dyn Store, segment: &FileSegment) -> Result<()> {
    Ok(store.put_json(&keys::segment(&segment.id), segment)?)
}

#[must_use]
pub fn get_segment(store: &dyn Store, id: &str) -> Result<Option<FileSegment>> {
    Ok(store.get_json(&keys::segment(id))?)
}

#[must_use]
pub fn list_segments_for_book(store: &dyn Store, book_id: &str) -> Result<Vec<FileSegment>> {
    let ids: Vec<String> = store.scan_prefix_json(&keys::segment_by_book_prefix(book_id))?;
    ids.into_iter()
        .filter_map(|id| get_segment(store, &id).transpose())
        .collect()
}

/// Finds the currently-active segment with this content hash, if any
/// (§8 invariant #2: at most one such segment can exist).
#[must_use]
pub fn find_active_segment_by_hash(store: &dyn Store, hash: &str) -> Result<Option<FileSegment>> {
    let Some(id) = store.get_json::<String>(&keys::segment_by_hash(hash))? else {
        return Ok(None);
    };
    match get_segment(store, &id)? {
        Some(segment) if segment.active => Ok(Some(segment)),
        _ => Ok(None),
    }
}

#[must_use]
pub fn is_blocked(store: &dyn Store, hash: &str) -> Result<Option<BlockedHash>> {
    Ok(store.get_json(&keys::blocked_hash(hash))?)
}

pub fn put_blocked_hash(store: &dyn Store, blocked: &BlockedHash) -> Result<()> {
    Ok(store.put_json(&keys::blocked_hash(&blocked.hash), blocked)?)
}

pub fn remove_blocked_hash(store: &dyn Store, hash: &str) -> Result<()> {
    Ok(store.delete(&keys::blocked_hash(hash))?)
}

#[must_use]
pub fn list_blocked_hashes(store: &dyn Store) -> Result<Vec<BlockedHash>> {
    Ok(store.scan_prefix_json(keys::BLOCKED_HASH)?)
}

#[must_use]
pub fn find_author_by_name(store: &dyn Store, normalized_name: &str) -> Result<Option<Author>> {
    let Some(id) = store.get_json::<String>(&keys::author_by_name(normalized_name))? else {
        return Ok(None);
    };
    Ok(store.get_json(&keys::author(&id))?)
}

pub fn put_author(store: &dyn Store, author: &Author) -> Result<()> {
    store.batch(vec![
        BatchOp::put(keys::author(&author.id), serde_json::to_vec(author)?),
        BatchOp::put(
            keys::author_by_name(&author.normalized_name),
            serde_json::to_vec(&author.id)?,
        ),
    ])?;
    Ok(())
}

#[must_use]
pub fn find_series_by_title(
    store: &dyn Store,
    author_id: &str,
    normalized_title: &str,
) -> Result<Option<Series>> {
    let Some(id) = store.get_json::<String>(&keys::series_by_title(author_id, normalized_title))?
    else {
        return Ok(None);
    };
    Ok(store.get_json(&keys::series(&id))?)
}

pub fn put_series(store: &dyn Store, series: &Series) -> Result<()> {
    let author_id = series.author_id.clone().unwrap_or_default();
    store.batch(vec![
        BatchOp::put(keys::series(&series.id), serde_json::to_vec(series)?),
        BatchOp::put(
            keys::series_by_title(&author_id, &series.normalized_title),
            serde_json::to_vec(&series.id)?,
        ),
    ])?;
    Ok(())
}

#[must_use]
pub fn get_work(store: &dyn Store, id: &str) -> Result<Option<Work>> {
    Ok(store.get_json(&keys::work(id))?)
}

pub fn put_work(store: &dyn Store, work: &Work) -> Result<()> {
    Ok(store.put_json(&keys::work(&work.id), work)?)
}

pub fn insert_progress(store: &dyn Store, progress: &Progress) -> Result<()> {
    store.batch(vec![
        BatchOp::put(keys::progress(&progress.id), serde_json::to_vec(progress)?),
        BatchOp::put(
            keys::progress_by_book(&progress.book_id, &progress.id),
            serde_json::to_vec(&progress.id)?,
        ),
    ])?;
    Ok(())
}

pub fn put_progress(store: &dyn Store, progress: &Progress) -> Result<()> {
    Ok(store.put_json(&keys::progress(&progress.id), progress)?)
}

#[must_use]
pub fn get_progress(store: &dyn Store, id: &str) -> Result<Option<Progress>> {
    Ok(store.get_json(&keys::progress(id))?)
}

#[must_use]
pub fn list_progress_for_book(store: &dyn Store, book_id: &str) -> Result<Vec<Progress>> {
    let ids: Vec<String> = store.scan_prefix_json(&keys::progress_by_book_prefix(book_id))?;
    ids.into_iter()
        .filter_map(|id| get_progress(store, &id).transpose())
        .collect()
}

pub fn put_operation(store: &dyn Store, operation: &Operation) -> Result<()> {
    Ok(store.put_json(&keys::operation(&operation.id), operation)?)
}

#[must_use]
pub fn get_operation(store: &dyn Store, id: &str) -> Result<Option<Operation>> {
    Ok(store.get_json(&keys::operation(id))?)
}

#[must_use]
pub fn list_operations(store: &dyn Store) -> Result<Vec<Operation>> {
    Ok(store.scan_prefix_json(keys::OPERATION)?)
}

/// Appends a log record to `operation_id`'s log, assigning the next
/// sequence number via the store's atomic counter so concurrent writers
/// never collide (§4.10 "Persistence").
pub fn append_log(store: &dyn Store, operation_id: &str, level: LogLevel, message: impl Into<String>) -> Result<()> {
    let counter_key = format!("op_log_seq:{operation_id}");
    let sequence = store.increment(&counter_key)?;
    let record = LogRecord {
        operation_id: operation_id.to_string(),
        sequence: sequence.max(0) as u64,
        level,
        message: message.into(),
        timestamp: chrono::Utc::now(),
    };
    Ok(store.put_json(&keys::op_log(operation_id, record.sequence), &record)?)
}

#[must_use]
pub fn list_logs(store: &dyn Store, operation_id: &str) -> Result<Vec<LogRecord>> {
    Ok(store.scan_prefix_json(&keys::op_log_prefix(operation_id))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn inserting_a_conflicting_path_is_rejected() {
        let store = MemoryStore::default();
        let book_a = Book::new_imported("Book A");
        let book_b = Book::new_imported("Book B");
        put_book(&store, &book_a).unwrap();
        put_book(&store, &book_b).unwrap();

        let path = std::path::PathBuf::from("/library/book.mp3");
        let source_a = SourcePath::new(&book_a.id, path.clone());
        insert_source_path(&store, &source_a).unwrap();

        let source_b = SourcePath::new(&book_b.id, path);
        let result = insert_source_path(&store, &source_b);
        assert!(matches!(result, Err(AppError::ConflictingPath { .. })));
    }

    #[test]
    fn find_active_segment_by_hash_ignores_inactive_segments() {
        let store = MemoryStore::default();
        let book = Book::new_imported("Book");
        put_book(&store, &book).unwrap();

        let mut segment = FileSegment::new(
            &book.id,
            std::path::PathBuf::from("/library/book.mp3"),
            "mp3".to_string(),
            100,
            "a".repeat(64),
        );
        insert_segment(&store, &segment).unwrap();
        assert!(find_active_segment_by_hash(&store, &segment.content_hash)
            .unwrap()
            .is_some());

        segment.active = false;
        put_segment(&store, &segment).unwrap();
        assert!(find_active_segment_by_hash(&store, &segment.content_hash)
            .unwrap()
            .is_none());
    }

    #[test]
    fn work_round_trips_through_the_store() {
        let store = MemoryStore::default();
        let work = Work::new("Neural Wraith", None);
        put_work(&store, &work).unwrap();

        let reloaded = get_work(&store, &work.id).unwrap().unwrap();
        assert_eq!(reloaded.title, "Neural Wraith");
    }
}
