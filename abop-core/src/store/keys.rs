//! Key prefix conventions for the generic `kv` table.
//!
//! Every entity is addressed by a `"{prefix}:{id}"` primary key plus, where
//! a lookup needs it, a secondary index key that maps a natural identifier
//! (a path, a hash, a normalized name) onto the primary id. Listing an
//! entity kind is a `scan_prefix` over its primary prefix; `BTreeMap`-style
//! lexical ordering inside `SqliteStore`/`MemoryStore` keeps scans sorted by
//! id, which is itself time-sortable (`crate::ids`).

pub const BOOK: &str = "book:";
pub const BOOK_BY_PATH: &str = "book_by_path:";
pub const SEGMENT: &str = "segment:";
pub const SEGMENT_BY_HASH: &str = "segment_by_hash:";
pub const SOURCE_PATH: &str = "source_path:";
pub const SEGMENT_BY_BOOK: &str = "segment_by_book:";
pub const SOURCE_PATH_BY_BOOK: &str = "source_path_by_book:";
pub const BLOCKED_HASH: &str = "blocked_hash:";
pub const OPERATION: &str = "operation:";
pub const OP_LOG: &str = "op_log:";
pub const AUTHOR: &str = "author:";
pub const AUTHOR_BY_NAME: &str = "author_by_name:";
pub const SERIES: &str = "series:";
pub const SERIES_BY_TITLE: &str = "series_by_title:";
pub const WORK: &str = "work:";
pub const PROGRESS: &str = "progress:";
pub const PROGRESS_BY_BOOK: &str = "progress_by_book:";

#[must_use]
pub fn book(id: &str) -> String {
    format!("{BOOK}{id}")
}

#[must_use]
pub fn book_by_path(path: &str) -> String {
    format!("{BOOK_BY_PATH}{path}")
}

#[must_use]
pub fn segment(id: &str) -> String {
    format!("{SEGMENT}{id}")
}

#[must_use]
pub fn segment_by_hash(hash: &str) -> String {
    format!("{SEGMENT_BY_HASH}{hash}")
}

#[must_use]
pub fn source_path(id: &str) -> String {
    format!("{SOURCE_PATH}{id}")
}

/// Secondary index: every active-or-not segment belonging to a book, so the
/// organizer and merge can list a book's segments without a table scan.
#[must_use]
pub fn segment_by_book(book_id: &str, segment_id: &str) -> String {
    format!("{SEGMENT_BY_BOOK}{book_id}:{segment_id}")
}

#[must_use]
pub fn segment_by_book_prefix(book_id: &str) -> String {
    format!("{SEGMENT_BY_BOOK}{book_id}:")
}

/// Secondary index: every source path belonging to a book.
#[must_use]
pub fn source_path_by_book(book_id: &str, source_path_id: &str) -> String {
    format!("{SOURCE_PATH_BY_BOOK}{book_id}:{source_path_id}")
}

#[must_use]
pub fn source_path_by_book_prefix(book_id: &str) -> String {
    format!("{SOURCE_PATH_BY_BOOK}{book_id}:")
}

#[must_use]
pub fn blocked_hash(hash: &str) -> String {
    format!("{BLOCKED_HASH}{hash}")
}

#[must_use]
pub fn operation(id: &str) -> String {
    format!("{OPERATION}{id}")
}

/// Log records sort lexically within an operation because the sequence
/// number is zero-padded to ten digits.
#[must_use]
pub fn op_log(operation_id: &str, sequence: u64) -> String {
    format!("{OP_LOG}{operation_id}:{sequence:010}")
}

#[must_use]
pub fn op_log_prefix(operation_id: &str) -> String {
    format!("{OP_LOG}{operation_id}:")
}

#[must_use]
pub fn author(id: &str) -> String {
    format!("{AUTHOR}{id}")
}

#[must_use]
pub fn author_by_name(normalized_name: &str) -> String {
    format!("{AUTHOR_BY_NAME}{normalized_name}")
}

#[must_use]
pub fn series(id: &str) -> String {
    format!("{SERIES}{id}")
}

#[must_use]
pub fn series_by_title(author_id: &str, normalized_title: &str) -> String {
    format!("{SERIES_BY_TITLE}{author_id}:{normalized_title}")
}

#[must_use]
pub fn work(id: &str) -> String {
    format!("{WORK}{id}")
}

#[must_use]
pub fn progress(id: &str) -> String {
    format!("{PROGRESS}{id}")
}

/// Secondary index: every progress record belonging to a book, so a merge
/// can find the records it needs to rewrite without a table scan.
#[must_use]
pub fn progress_by_book(book_id: &str, progress_id: &str) -> String {
    format!("{PROGRESS_BY_BOOK}{book_id}:{progress_id}")
}

#[must_use]
pub fn progress_by_book_prefix(book_id: &str) -> String {
    format!("{PROGRESS_BY_BOOK}{book_id}:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_log_keys_sort_by_sequence() {
        let first = op_log("op-1", 2);
        let second = op_log("op-1", 10);
        assert!(first < second, "{first} should sort before {second}");
    }
}
