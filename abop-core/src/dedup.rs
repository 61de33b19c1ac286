//! The DedupEngine (§4.6): classifies a scanner candidate against the
//! store and applies the side effects the chosen category requires.

use crate::capabilities::TagValues;
use crate::error::Result;
use crate::events::EventBus;
use crate::filename_parser::ParsedFilename;
use crate::models::book::normalize_title;
use crate::models::provenance::FieldName;
use crate::models::{Book, DomainEvent, FileSegment, LibraryState, SourcePath};
use crate::repo;
use crate::scanner::DiscoveredBook;
use crate::store::Store;

/// The outcome of classifying one [`DiscoveredBook`] (§4.6 contract).
#[derive(Debug, Clone)]
pub enum Classification {
    Blocked { hash: String, reason: String },
    DuplicateExactPath { book_id: String },
    DuplicateNewPath { book_id: String },
    WantedMatch { book_id: String },
    New { book_id: String },
}

/// Classifies `candidate` and applies its side effects in one store batch
/// per branch. Resolution order: `Blocked > ExactPath > NewPath > Wanted >
/// New` (§4.6).
///
/// # Errors
///
/// Returns a store error if a read or write fails.
pub fn classify(
    store: &dyn Store,
    events: &EventBus,
    candidate: &DiscoveredBook,
) -> Result<Classification> {
    let Some(primary) = candidate.files.first() else {
        // A group with no readable files never reaches the dedup engine
        // (the scanner filters it out before emitting), but stay defensive.
        return Err(crate::error::AppError::validation(
            "candidate",
            "discovered book has no files",
        ));
    };

    if let Some(blocked) = repo::is_blocked(store, &primary.content_hash)? {
        return Ok(Classification::Blocked {
            hash: blocked.hash,
            reason: blocked.reason,
        });
    }

    if let Some(existing) = repo::get_source_path_by_path(store, &primary.path)? {
        events.publish(DomainEvent::DedupDuplicateExactPath {
            book_id: existing.book_id.clone(),
            path: primary.path.to_string_lossy().into_owned(),
        });
        return Ok(Classification::DuplicateExactPath {
            book_id: existing.book_id,
        });
    }

    if let Some(segment) = repo::find_active_segment_by_hash(store, &primary.content_hash)? {
        let source_path = SourcePath::new(&segment.book_id, primary.path.clone());
        repo::insert_source_path(store, &source_path)?;
        events.publish(DomainEvent::DedupDuplicateNewPath {
            book_id: segment.book_id.clone(),
            path: primary.path.to_string_lossy().into_owned(),
        });
        return Ok(Classification::DuplicateNewPath {
            book_id: segment.book_id,
        });
    }

    if let Some(book_id) = find_wanted_match(store, &candidate.parsed, &primary.tags)? {
        attach_to_book(store, &book_id, candidate)?;
        crate::state_machine::transition(store, &book_id, LibraryState::Imported)?;
        events.publish(DomainEvent::DedupWantedMatched {
            book_id: book_id.clone(),
            path: primary.path.to_string_lossy().into_owned(),
        });
        return Ok(Classification::WantedMatch { book_id });
    }

    let book_id = create_new_book(store, events, candidate)?;
    Ok(Classification::New { book_id })
}

fn find_wanted_match(
    store: &dyn Store,
    parsed: &ParsedFilename,
    tags: &TagValues,
) -> Result<Option<String>> {
    let normalized_title = normalize_title(&parsed.title);
    let isbn = tags.isbn13.as_deref().or(tags.isbn10.as_deref());

    for book in repo::list_books(store)? {
        if book.library_state != LibraryState::Wanted {
            continue;
        }
        if let Some(isbn) = isbn {
            let book_isbn13 = book.effective(FieldName::Isbn13);
            let book_isbn10 = book.effective(FieldName::Isbn10);
            if book_isbn13.as_deref() == Some(isbn) || book_isbn10.as_deref() == Some(isbn) {
                return Ok(Some(book.id));
            }
        }
        if book.normalized_title == normalized_title {
            let author_matches = match &parsed.author {
                None => true,
                Some(parsed_author) => {
                    let normalized_author = normalize_title(parsed_author);
                    book.effective(FieldName::Author)
                        .map(|a| normalize_title(&a))
                        .is_none_or(|existing| existing == normalized_author)
                }
            };
            if author_matches {
                return Ok(Some(book.id));
            }
        }
    }
    Ok(None)
}

/// Attaches every file in `candidate` to an existing book as new segments
/// and source paths (used by the `WantedMatch` branch).
fn attach_to_book(store: &dyn Store, book_id: &str, candidate: &DiscoveredBook) -> Result<()> {
    for file in &candidate.files {
        let segment = FileSegment::new(
            book_id,
            file.path.clone(),
            file.format.clone(),
            file.size_bytes,
            file.content_hash.clone(),
        );
        repo::insert_segment(store, &segment)?;
        let source_path = SourcePath::new(book_id, file.path.clone());
        repo::insert_source_path(store, &source_path)?;
    }
    Ok(())
}

fn create_new_book(store: &dyn Store, events: &EventBus, candidate: &DiscoveredBook) -> Result<String> {
    let mut book = Book::new_imported(&candidate.parsed.title);
    let primary_tags = &candidate.files[0].tags;

    set_file_field(&mut book, FieldName::Title, primary_tags.title.clone().or_else(|| Some(candidate.parsed.title.clone())));
    set_file_field(&mut book, FieldName::Author, primary_tags.author.clone().or_else(|| candidate.parsed.author.clone()));
    set_file_field(&mut book, FieldName::Series, primary_tags.series.clone().or_else(|| candidate.parsed.series.clone()));
    set_file_field(&mut book, FieldName::Narrator, primary_tags.narrator.clone());
    set_file_field(&mut book, FieldName::Publisher, primary_tags.publisher.clone());
    set_file_field(&mut book, FieldName::Language, primary_tags.language.clone());
    set_file_field(&mut book, FieldName::Isbn10, primary_tags.isbn10.clone());
    set_file_field(&mut book, FieldName::Isbn13, primary_tags.isbn13.clone());
    set_file_field(&mut book, FieldName::PublishedYear, primary_tags.published_year.clone());
    set_file_field(&mut book, FieldName::Description, primary_tags.description.clone());
    book.refresh_title_cache();

    if let Some(position) = candidate.parsed.position {
        book.series_position = Some(f64::from(position));
    }

    repo::put_book(store, &book)?;
    events.publish(DomainEvent::BookCreated { book_id: book.id.clone() });

    for file in &candidate.files {
        let segment = FileSegment::new(
            &book.id,
            file.path.clone(),
            file.format.clone(),
            file.size_bytes,
            file.content_hash.clone(),
        );
        repo::insert_segment(store, &segment)?;
        let source_path = SourcePath::new(&book.id, file.path.clone());
        repo::insert_source_path(store, &source_path)?;
        events.publish(DomainEvent::SegmentAdded {
            book_id: book.id.clone(),
            segment_id: segment.id,
        });
    }

    Ok(book.id)
}

fn set_file_field(book: &mut Book, field: FieldName, value: Option<String>) {
    if value.is_some() {
        book.fields.entry(field).or_default().set_file(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockedHash;
    use crate::scanner::DiscoveredFile;
    use crate::store::MemoryStore;
    use std::path::PathBuf;

    fn candidate(path: &str, hash: &str, title: &str) -> DiscoveredBook {
        DiscoveredBook {
            candidate_id: crate::ids::new_id(),
            files: vec![DiscoveredFile {
                path: PathBuf::from(path),
                size_bytes: 100,
                format: "mp3".into(),
                content_hash: hash.to_string(),
                tags: TagValues::default(),
            }],
            parsed: ParsedFilename {
                title: title.to_string(),
                author: None,
                series: None,
                position: None,
            },
        }
    }

    #[test]
    fn blocked_hash_takes_priority_over_everything() {
        let store = MemoryStore::default();
        let events = EventBus::new();
        let blocked = BlockedHash::new(&"a".repeat(64), "dmca").unwrap();
        repo::put_blocked_hash(&store, &blocked).unwrap();

        let result = classify(&store, &events, &candidate("/lib/x.mp3", &"a".repeat(64), "X")).unwrap();
        assert!(matches!(result, Classification::Blocked { .. }));
    }

    #[test]
    fn same_path_rescanned_is_an_exact_duplicate() {
        let store = MemoryStore::default();
        let events = EventBus::new();
        let first = classify(&store, &events, &candidate("/lib/x.mp3", &"b".repeat(64), "X")).unwrap();
        let Classification::New { book_id } = first else { panic!("expected New") };

        let second = classify(&store, &events, &candidate("/lib/x.mp3", &"b".repeat(64), "X")).unwrap();
        assert!(matches!(second, Classification::DuplicateExactPath { book_id: id } if id == book_id));
    }

    #[test]
    fn same_hash_new_path_is_a_new_path_duplicate() {
        let store = MemoryStore::default();
        let events = EventBus::new();
        let first = classify(&store, &events, &candidate("/lib/x.mp3", &"c".repeat(64), "X")).unwrap();
        let Classification::New { book_id } = first else { panic!("expected New") };

        let second = classify(&store, &events, &candidate("/lib/y.mp3", &"c".repeat(64), "X")).unwrap();
        assert!(matches!(second, Classification::DuplicateNewPath { book_id: id } if id == book_id));
    }

    #[test]
    fn title_match_against_a_wanted_book_transitions_it_to_imported() {
        let store = MemoryStore::default();
        let events = EventBus::new();
        let wanted = Book::new_wanted("Neural Wraith");
        repo::put_book(&store, &wanted).unwrap();

        let result = classify(&store, &events, &candidate("/lib/neural.mp3", &"d".repeat(64), "Neural Wraith")).unwrap();
        assert!(matches!(result, Classification::WantedMatch { book_id } if book_id == wanted.id));

        let reloaded = repo::require_book(&store, &wanted.id).unwrap();
        assert_eq!(reloaded.library_state, LibraryState::Imported);
    }

    #[test]
    fn genuinely_new_content_creates_a_new_book() {
        let store = MemoryStore::default();
        let events = EventBus::new();
        let result = classify(&store, &events, &candidate("/lib/new.mp3", &"e".repeat(64), "Brand New")).unwrap();
        assert!(matches!(result, Classification::New { .. }));
        assert_eq!(repo::list_books(&store).unwrap().len(), 1);
    }
}
