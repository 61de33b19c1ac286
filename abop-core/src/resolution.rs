//! The ResolutionEngine (§4.5): queries configured metadata providers in
//! parallel and merges their results into a book's field state via the
//! [`crate::provenance_engine`].

use crate::capabilities::{Candidate, MetadataProvider};
use crate::error::Result;
use crate::models::provenance::FieldName;
use crate::models::{Book, LogLevel};
use crate::provenance_engine;
use crate::repo;
use crate::store::Store;
use std::sync::Arc;
use std::time::Duration;

/// How aggressively a resolve call overwrites `stored_value` (§4.5 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Only fill fields that currently have no effective value.
    OnlyMissing,
    /// Overwrite every non-locked, non-overridden field with fresh data.
    RefreshAll,
}

/// The tracked fields a provider result can populate, in display order.
const RESOLVABLE_FIELDS: [FieldName; 10] = [
    FieldName::Title,
    FieldName::Author,
    FieldName::Narrator,
    FieldName::Series,
    FieldName::Publisher,
    FieldName::Language,
    FieldName::Isbn10,
    FieldName::Isbn13,
    FieldName::PublishedYear,
    FieldName::Description,
];

fn field_value(candidate: &Candidate, field: FieldName) -> Option<String> {
    match field {
        FieldName::Title => candidate.title.clone(),
        FieldName::Author => candidate.author.clone(),
        FieldName::Narrator => candidate.narrator.clone(),
        FieldName::Series => candidate.series.clone(),
        FieldName::Publisher => candidate.publisher.clone(),
        FieldName::Language => candidate.language.clone(),
        FieldName::Isbn10 => candidate.isbn10.clone(),
        FieldName::Isbn13 => candidate.isbn13.clone(),
        FieldName::PublishedYear => candidate.published_year.clone(),
        FieldName::Description => candidate.description.clone(),
        FieldName::CoverRef => candidate.cover_ref.clone(),
    }
}

/// Resolves `book_id` against `providers` (already in priority order) and
/// applies the merged result per `policy`. `operation_id`, if given, is
/// used to record per-provider failures on the running operation's log
/// (§4.5 "Failure semantics").
///
/// # Errors
///
/// Returns a store error; provider failures are recorded, not propagated.
pub async fn resolve(
    store: &dyn Store,
    providers: &[Arc<dyn MetadataProvider>],
    book_id: &str,
    policy: ResolutionPolicy,
    timeout: Duration,
    operation_id: Option<&str>,
) -> Result<Vec<FieldName>> {
    let book = repo::require_book(store, book_id)?;

    let before: Vec<(FieldName, Option<String>, bool)> = RESOLVABLE_FIELDS
        .iter()
        .map(|&f| {
            let locked = book.fields.get(&f).is_some_and(|s| s.override_locked);
            let overridden = book.fields.get(&f).is_some_and(|s| s.override_value.is_some());
            (f, book.effective(f), locked || overridden)
        })
        .collect();

    let candidates = query_providers(store, providers, &book, timeout, operation_id).await;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    for &field in &RESOLVABLE_FIELDS {
        let merged = candidates.iter().find_map(|c| field_value(c, field));
        provenance_engine::set_fetched(store, book_id, field, merged.clone())?;

        let (_, current_effective, frozen) = before
            .iter()
            .find(|(f, ..)| *f == field)
            .cloned()
            .unwrap_or((field, None, false));
        if frozen {
            continue;
        }

        let should_store = match policy {
            ResolutionPolicy::OnlyMissing => current_effective.is_none() && merged.is_some(),
            ResolutionPolicy::RefreshAll => merged.is_some(),
        };
        if should_store {
            provenance_engine::set_stored(store, book_id, field, merged)?;
        }
    }

    let after = repo::require_book(store, book_id)?;
    let changed = before
        .iter()
        .filter(|(field, previous, _)| after.effective(*field).as_ref() != previous.as_ref())
        .map(|(field, ..)| *field)
        .collect();
    Ok(changed)
}

async fn query_providers(
    store: &dyn Store,
    providers: &[Arc<dyn MetadataProvider>],
    book: &Book,
    timeout: Duration,
    operation_id: Option<&str>,
) -> Vec<Candidate> {
    let isbn = book.effective(FieldName::Isbn13).or_else(|| book.effective(FieldName::Isbn10));
    let author = book.effective(FieldName::Author);

    let calls = providers.iter().map(|provider| {
        let title = book.title.clone();
        let isbn = isbn.clone();
        let author = author.clone();
        async move {
            let call = async {
                if let Some(isbn) = &isbn {
                    provider.get_by_isbn(isbn).await
                } else {
                    provider.search_by_title_author(&title, author.as_deref()).await
                }
            };
            let outcome = tokio::time::timeout(timeout, call).await;
            (provider.name().to_string(), outcome)
        }
    });

    let mut candidates = Vec::new();
    for (provider_name, outcome) in futures::future::join_all(calls).await {
        match outcome {
            Ok(Ok(Some(candidate))) => candidates.push(candidate),
            Ok(Ok(None)) => {}
            Ok(Err(err)) => log_provider_failure(store, operation_id, &provider_name, &err.to_string()),
            Err(_) => log_provider_failure(store, operation_id, &provider_name, "provider call timed out"),
        }
    }
    candidates
}

fn log_provider_failure(store: &dyn Store, operation_id: Option<&str>, provider_name: &str, reason: &str) {
    if let Some(operation_id) = operation_id {
        let _ = repo::append_log(
            store,
            operation_id,
            LogLevel::Warn,
            format!("provider '{provider_name}' failed: {reason}"),
        );
    }
}

/// Resolves many books in parallel, up to `worker_count` at a time
/// (§4.5 "Concurrency" / §5 "bulk-resolve").
///
/// # Errors
///
/// Returns an error only if a book id doesn't exist; provider-level
/// failures are handled per-book inside [`resolve`].
pub async fn resolve_bulk(
    store: &dyn Store,
    providers: &[Arc<dyn MetadataProvider>],
    book_ids: &[String],
    policy: ResolutionPolicy,
    timeout: Duration,
    worker_count: usize,
    operation_id: Option<&str>,
) -> Vec<Result<Vec<FieldName>>> {
    use futures::stream::StreamExt;

    futures::stream::iter(book_ids.iter())
        .map(|book_id| resolve(store, providers, book_id, policy, timeout, operation_id))
        .buffer_unordered(worker_count.max(1))
        .collect::<Vec<_>>()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::FakeMetadataProvider;

    fn candidate(source: &str, author: Option<&str>) -> Candidate {
        Candidate { source: source.to_string(), author: author.map(str::to_string), ..Candidate::default() }
    }

    #[tokio::test]
    async fn only_missing_policy_fills_a_blank_field_but_not_an_existing_one() {
        let store = MemoryStore::default();
        let mut book = Book::new_wanted("Neural Wraith");
        book.fields.entry(FieldName::Title).or_default().set_stored(Some("Neural Wraith".into()));
        repo::put_book(&store, &book).unwrap();

        let providers: Vec<Arc<dyn MetadataProvider>> = vec![Arc::new(FakeMetadataProvider::new(
            "fake",
            Some(candidate("fake", Some("K.D. Robertson"))),
        ))];

        let changed = resolve(&store, &providers, &book.id, ResolutionPolicy::OnlyMissing, Duration::from_secs(1), None)
            .await
            .unwrap();
        assert!(changed.contains(&FieldName::Author));

        let reloaded = repo::require_book(&store, &book.id).unwrap();
        assert_eq!(reloaded.effective(FieldName::Author).as_deref(), Some("K.D. Robertson"));
        assert_eq!(reloaded.effective(FieldName::Title).as_deref(), Some("Neural Wraith"));
    }

    #[tokio::test]
    async fn a_locked_field_is_never_overwritten() {
        let store = MemoryStore::default();
        let mut book = Book::new_wanted("Title");
        book.fields.entry(FieldName::Author).or_default().set_override("Pinned Author".into());
        book.fields.entry(FieldName::Author).or_default().set_locked(true);
        repo::put_book(&store, &book).unwrap();

        let providers: Vec<Arc<dyn MetadataProvider>> = vec![Arc::new(FakeMetadataProvider::new(
            "fake",
            Some(candidate("fake", Some("Someone Else"))),
        ))];

        let changed = resolve(&store, &providers, &book.id, ResolutionPolicy::RefreshAll, Duration::from_secs(1), None)
            .await
            .unwrap();
        assert!(!changed.contains(&FieldName::Author));

        let reloaded = repo::require_book(&store, &book.id).unwrap();
        assert_eq!(reloaded.effective(FieldName::Author).as_deref(), Some("Pinned Author"));
    }

    #[tokio::test]
    async fn no_provider_match_returns_an_empty_applied_set() {
        let store = MemoryStore::default();
        let book = Book::new_wanted("Title");
        repo::put_book(&store, &book).unwrap();

        let providers: Vec<Arc<dyn MetadataProvider>> =
            vec![Arc::new(FakeMetadataProvider::new("fake", None))];

        let changed = resolve(&store, &providers, &book.id, ResolutionPolicy::RefreshAll, Duration::from_secs(1), None)
            .await
            .unwrap();
        assert!(changed.is_empty());
    }
}
