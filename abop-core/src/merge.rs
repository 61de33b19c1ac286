//! Merges a book's multiple active segments into one (§4.9).

use crate::error::{AppError, Result};
use crate::models::FileSegment;
use crate::repo;
use crate::store::Store;
use std::path::PathBuf;

/// The result of a merge: the new segment and how many progress records
/// were rewritten onto it.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub new_segment_id: String,
    pub progress_records_rewritten: usize,
}

/// Merges every active segment of `book_id`, in ascending `track_number`
/// order (falling back to creation order when track numbers are absent or
/// tied), into a single new segment at `merged_path` with `merged_hash`.
///
/// Steps (§4.9): create the new segment, mark the old ones
/// `active = false` with `superseded_by` set, rewrite playback-progress
/// records onto the new segment using the duration map of the pre-merge
/// order, and leave the old hashes unblocked.
///
/// # Errors
///
/// Returns a validation error if fewer than two active segments exist, or
/// a store error on read/write failure.
pub fn merge(
    store: &dyn Store,
    book_id: &str,
    merged_path: PathBuf,
    merged_format: String,
    merged_size_bytes: u64,
    merged_hash: String,
) -> Result<MergeOutcome> {
    let mut segments = repo::list_segments_for_book(store, book_id)?
        .into_iter()
        .filter(|s| s.active)
        .collect::<Vec<_>>();
    segments.sort_by_key(|s| (s.track_number, s.created_at));

    if segments.len() < 2 {
        return Err(AppError::validation(
            "segments",
            "merge requires at least two active segments",
        ));
    }

    let new_segment = FileSegment::new(book_id, merged_path, merged_format, merged_size_bytes, merged_hash);
    repo::insert_segment(store, &new_segment)?;

    let mut cumulative_offset = 0.0;
    let mut rewritten = 0usize;
    for old in &segments {
        for mut progress in repo::list_progress_for_book(store, book_id)? {
            if progress.segment_id == old.id {
                progress.rewrite_onto_merged_segment(&new_segment.id, cumulative_offset);
                repo::put_progress(store, &progress)?;
                rewritten += 1;
            }
        }
        cumulative_offset += old.duration_seconds.unwrap_or(0.0);
    }

    for mut old in segments {
        old.active = false;
        old.superseded_by = Some(new_segment.id.clone());
        repo::put_segment(store, &old)?;
    }

    Ok(MergeOutcome {
        new_segment_id: new_segment.id,
        progress_records_rewritten: rewritten,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, Progress};
    use crate::repo;
    use crate::store::MemoryStore;
    use std::path::PathBuf;

    fn segment_with_duration(book_id: &str, track: u32, duration: f64) -> FileSegment {
        let mut segment = FileSegment::new(
            book_id,
            PathBuf::from(format!("/library/track{track}.mp3")),
            "mp3".to_string(),
            1000,
            format!("{track:0<64}"),
        );
        segment.track_number = Some(track);
        segment.duration_seconds = Some(duration);
        segment
    }

    #[test]
    fn merging_marks_old_segments_inactive_and_links_to_the_new_one() {
        let store = MemoryStore::default();
        let book = Book::new_imported("Multi-Part Book");
        repo::put_book(&store, &book).unwrap();

        let first = segment_with_duration(&book.id, 1, 600.0);
        let second = segment_with_duration(&book.id, 2, 500.0);
        repo::insert_segment(&store, &first).unwrap();
        repo::insert_segment(&store, &second).unwrap();

        let outcome = merge(
            &store,
            &book.id,
            PathBuf::from("/library/merged.mp3"),
            "mp3".to_string(),
            2000,
            "m".repeat(64),
        )
        .unwrap();

        let reloaded_first = repo::get_segment(&store, &first.id).unwrap().unwrap();
        let reloaded_second = repo::get_segment(&store, &second.id).unwrap().unwrap();
        assert!(!reloaded_first.active);
        assert!(!reloaded_second.active);
        assert_eq!(reloaded_first.superseded_by.as_deref(), Some(outcome.new_segment_id.as_str()));
        assert_eq!(reloaded_second.superseded_by.as_deref(), Some(outcome.new_segment_id.as_str()));

        assert!(repo::is_blocked(&store, &first.content_hash).unwrap().is_none());
    }

    #[test]
    fn progress_on_the_second_segment_is_offset_by_the_first_segments_duration() {
        let store = MemoryStore::default();
        let book = Book::new_imported("Multi-Part Book");
        repo::put_book(&store, &book).unwrap();

        let first = segment_with_duration(&book.id, 1, 600.0);
        let second = segment_with_duration(&book.id, 2, 500.0);
        repo::insert_segment(&store, &first).unwrap();
        repo::insert_segment(&store, &second).unwrap();

        let progress = Progress::new(&book.id, &second.id, 45.0);
        repo::insert_progress(&store, &progress).unwrap();

        let outcome = merge(
            &store,
            &book.id,
            PathBuf::from("/library/merged.mp3"),
            "mp3".to_string(),
            2000,
            "n".repeat(64),
        )
        .unwrap();

        assert_eq!(outcome.progress_records_rewritten, 1);
        let reloaded = repo::get_progress(&store, &progress.id).unwrap().unwrap();
        assert_eq!(reloaded.segment_id, outcome.new_segment_id);
        assert_eq!(reloaded.offset_seconds, 645.0);
    }

    #[test]
    fn merging_fewer_than_two_segments_is_rejected() {
        let store = MemoryStore::default();
        let book = Book::new_imported("Single-File Book");
        repo::put_book(&store, &book).unwrap();
        let only = segment_with_duration(&book.id, 1, 600.0);
        repo::insert_segment(&store, &only).unwrap();

        let result = merge(
            &store,
            &book.id,
            PathBuf::from("/library/merged.mp3"),
            "mp3".to_string(),
            2000,
            "z".repeat(64),
        );
        assert!(result.is_err());
    }
}
