//! Fixture builders and fake capability implementations shared across this
//! crate's unit tests.

use crate::capabilities::{AudioTagReader, Candidate, MetadataProvider, TagValues};
use crate::error::Result;
use crate::models::{Book, FileSegment, SourcePath};
use crate::repo;
use crate::store::Store;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;

/// Builds an `Imported` book with one active segment and source path
/// already persisted, returning the book.
pub fn make_book(store: &dyn Store, title: &str) -> Book {
    let book = Book::new_imported(title);
    repo::put_book(store, &book).expect("put_book");
    let path = PathBuf::from(format!("/library/{title}.mp3"));
    let source_path = SourcePath::new(&book.id, path.clone());
    repo::insert_source_path(store, &source_path).expect("insert_source_path");
    let segment = make_segment(store, &book.id, path);
    repo::insert_segment(store, &segment).expect("insert_segment");
    book
}

/// Builds and persists a segment for `book_id` at `path`, with a hash
/// derived from the path so distinct paths never collide by accident.
pub fn make_segment(store: &dyn Store, book_id: &str, path: PathBuf) -> FileSegment {
    let hash = format!("{:064x}", path.to_string_lossy().len());
    let segment = FileSegment::new(book_id, path, "mp3".to_string(), 1024, hash);
    repo::insert_segment(store, &segment).expect("insert_segment");
    segment
}

/// An [`AudioTagReader`] that returns a fixed, configurable result for
/// every call, recording the paths it was asked about.
#[derive(Default)]
pub struct FakeAudioTagReader {
    pub tags: TagValues,
    pub seen_paths: Mutex<Vec<PathBuf>>,
}

impl FakeAudioTagReader {
    #[must_use]
    pub fn with_tags(tags: TagValues) -> Self {
        Self { tags, seen_paths: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl AudioTagReader for FakeAudioTagReader {
    async fn read_tags(&self, path: &std::path::Path) -> Result<TagValues> {
        self.seen_paths.lock().unwrap().push(path.to_path_buf());
        Ok(self.tags.clone())
    }
}

/// A [`MetadataProvider`] that always returns the same candidate (or
/// `None`), regardless of the query.
pub struct FakeMetadataProvider {
    pub provider_name: &'static str,
    pub result: Option<Candidate>,
}

impl FakeMetadataProvider {
    #[must_use]
    pub fn new(provider_name: &'static str, result: Option<Candidate>) -> Self {
        Self { provider_name, result }
    }
}

#[async_trait]
impl MetadataProvider for FakeMetadataProvider {
    fn name(&self) -> &str {
        self.provider_name
    }

    async fn search_by_title_author(&self, _title: &str, _author: Option<&str>) -> Result<Option<Candidate>> {
        Ok(self.result.clone())
    }

    async fn get_by_isbn(&self, _isbn: &str) -> Result<Option<Candidate>> {
        Ok(self.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn make_book_persists_a_book_with_one_segment_and_source_path() {
        let store = MemoryStore::default();
        let book = make_book(&store, "Neural Wraith");
        assert_eq!(repo::list_segments_for_book(&store, &book.id).unwrap().len(), 1);
        assert_eq!(repo::list_source_paths_for_book(&store, &book.id).unwrap().len(), 1);
    }
}
