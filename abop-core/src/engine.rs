//! The engine facade (§6.2): the single programmatic surface a transport
//! adapts. Owns the store, event bus, operation queue, and the configured
//! collaborators (tag reader, metadata providers), and implements every
//! verb in terms of the components built elsewhere in this crate.

use crate::capabilities::{AudioTagReader, DefaultAudioTagReader, MetadataProvider};
use crate::config::Config;
use crate::constants::DEFAULT_SUPPORTED_EXTENSIONS;
use crate::dedup::{self, Classification};
use crate::error::{AppError, Result};
use crate::events::EventBus;
use crate::filename_parser;
use crate::hash::hash_file;
use crate::models::provenance::FieldName;
use crate::models::{
    Author, BlockedHash, Book, DomainEvent, LibraryState, LogRecord, Operation, OperationKind,
    Page, PageRequest, Series,
};
use crate::operations::{OperationContext, OperationDispatcher, OperationQueue};
use crate::organizer;
use crate::provenance_engine;
use crate::purge;
use crate::repo;
use crate::resolution::{self, ResolutionPolicy};
use crate::scanner::{
    DefaultFileDiscoverer, DiscoveredBook, DiscoveredFile, ProgressReporter, ScanOptions,
    ScanProgress, Scanner, TaskManager,
};
use crate::state_machine;
use crate::store::Store;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Advisory per-book lock registry (§5 "Ordering guarantees", §9
/// "Concurrency primitive"): a bounded-lifetime map from `book_id` to a
/// lightweight mutex, not a process-global write lock.
#[derive(Default)]
struct BookLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl BookLocks {
    fn entry(&self, book_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(
            locks
                .entry(book_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Drops the map entry once this caller was the only remaining holder,
    /// so the registry doesn't grow without bound over the library's life.
    fn vacate(&self, book_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(book_id);
        }
        drop(lock);
    }
}

/// How `ImportFile` should behave beyond ingestion (§6.2 "options").
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Run the organizer on the resulting book immediately after import.
    pub organize_after: bool,
}

/// Filter accepted by `ListBooks` (§6.2).
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub library_state: Option<LibraryState>,
    pub author_id: Option<String>,
    pub series_id: Option<String>,
    /// Case-insensitive substring match against the book's title.
    pub search: Option<String>,
}

impl BookFilter {
    fn matches(&self, book: &Book) -> bool {
        if let Some(state) = self.library_state {
            if book.library_state != state {
                return false;
            }
        }
        if let Some(author_id) = &self.author_id {
            if book.author_id.as_deref() != Some(author_id.as_str()) {
                return false;
            }
        }
        if let Some(series_id) = &self.series_id {
            if book.series_id.as_deref() != Some(series_id.as_str()) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !book.title.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// One field edit requested by `UpdateBook` (§6.2 "override flags").
#[derive(Debug, Clone)]
pub struct FieldUpdate {
    pub value: Option<String>,
    pub as_override: bool,
}

/// The partial update payload for `UpdateBook`.
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub fields: HashMap<FieldName, FieldUpdate>,
    pub tags: Option<HashSet<String>>,
}

/// What kind of thing `AddWanted` should create (§6.2, §3.2).
#[derive(Debug, Clone)]
pub enum WantedKind {
    Book { title: String, author: Option<String> },
    Author { name: String },
    Series { title: String, author: Option<String> },
}

/// One entry returned by `BrowseFilesystem` (§6.2, §6.3).
#[derive(Debug, Clone)]
pub struct FilesystemEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub size_bytes: Option<u64>,
    pub readonly: bool,
    pub is_audio_file: bool,
    /// Set for a directory that directly contains an exclude sentinel
    /// (§6.3 `.jabexclude`).
    pub excluded: bool,
}

/// State shared between the facade and the operation dispatcher it hands
/// to the queue. Kept separate from [`Engine`] so the dispatcher can hold
/// an `Arc` to it without a cycle back through the queue.
struct Shared {
    store: Arc<dyn Store>,
    events: EventBus,
    tag_reader: Arc<dyn AudioTagReader>,
    providers: Vec<Arc<dyn MetadataProvider>>,
    config: Mutex<Config>,
    book_locks: BookLocks,
}

impl Shared {
    fn config_snapshot(&self) -> Config {
        self.config.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    async fn with_book_lock<T>(&self, book_id: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.book_locks.entry(book_id);
        let guard = lock.lock().await;
        let result = f();
        drop(guard);
        self.book_locks.vacate(book_id, lock);
        result
    }
}

/// The engine (§2 "System Overview", §6.2): the ingestion and
/// reconciliation core, independent of any particular transport.
pub struct Engine {
    shared: Arc<Shared>,
    queue: OperationQueue,
}

impl Engine {
    /// Builds an engine over `store`, recovering any operations interrupted
    /// by a prior process exit (§9 "Operation queue durability").
    ///
    /// # Errors
    ///
    /// Returns a store error if recovery can't read the operation table.
    pub fn new(
        store: Arc<dyn Store>,
        tag_reader: Arc<dyn AudioTagReader>,
        providers: Vec<Arc<dyn MetadataProvider>>,
        config: Config,
    ) -> Result<Self> {
        OperationQueue::recover(&*store)?;

        let shared = Arc::new(Shared {
            store: Arc::clone(&store),
            events: EventBus::new(),
            tag_reader,
            providers,
            config: Mutex::new(config.clone()),
            book_locks: BookLocks::default(),
        });

        let dispatcher: Arc<dyn OperationDispatcher> = Arc::new(EngineDispatcher { shared: Arc::clone(&shared) });
        let queue = OperationQueue::with_worker_count(store, shared.events.clone(), dispatcher, config.operation_workers);

        Ok(Self { shared, queue })
    }

    /// Builds an engine with the default audio-tag reader and no
    /// configured metadata providers, the common case for a fresh install.
    ///
    /// # Errors
    ///
    /// Returns a store error if recovery can't read the operation table.
    pub fn with_defaults(store: Arc<dyn Store>, config: Config) -> Result<Self> {
        Self::new(store, Arc::new(DefaultAudioTagReader), Vec::new(), config)
    }

    #[must_use]
    pub fn events(&self) -> EventBus {
        self.shared.events.clone()
    }

    #[must_use]
    pub fn config(&self) -> Config {
        self.shared.config_snapshot()
    }

    // ---- ListBooks ----------------------------------------------------

    /// # Errors
    ///
    /// Returns a store error on read failure.
    pub fn list_books(&self, filter: &BookFilter, page: PageRequest) -> Result<Page<Book>> {
        let mut books: Vec<Book> = repo::list_books(&*self.shared.store)?
            .into_iter()
            .filter(|b| filter.matches(b))
            .collect();
        books.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(Page::slice(books, page))
    }

    // ---- GetBook --------------------------------------------------------

    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if `id` doesn't resolve.
    pub fn get_book(&self, id: &str) -> Result<Book> {
        repo::require_book(&*self.shared.store, id)
    }

    // ---- UpdateBook -----------------------------------------------------

    /// Applies `update`'s field edits (as `SetStored` or `SetOverride`, per
    /// each field's `as_override` flag) and tag replacement, serialized
    /// against concurrent updates to the same book (§5 "Ordering
    /// guarantees").
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if `id` doesn't resolve, or a store
    /// error on write failure.
    pub async fn update_book(&self, id: &str, update: BookUpdate) -> Result<Book> {
        let store = Arc::clone(&self.shared.store);
        let events = self.shared.events.clone();
        let id = id.to_string();
        self.shared
            .with_book_lock(&id, move || {
                repo::require_book(&store, &id)?;
                for (field, edit) in &update.fields {
                    if edit.as_override {
                        if let Some(value) = &edit.value {
                            provenance_engine::set_override(&store, &id, *field, value.clone())?;
                        } else {
                            provenance_engine::clear_override(&store, &id, *field, false)?;
                        }
                    } else {
                        provenance_engine::set_stored(&store, &id, *field, edit.value.clone())?;
                    }
                }
                if let Some(tags) = update.tags.clone() {
                    let mut book = repo::require_book(&store, &id)?;
                    book.tags = tags;
                    book.touch();
                    repo::put_book(&store, &book)?;
                }
                let book = repo::require_book(&store, &id)?;
                events.publish(DomainEvent::BookUpdated { book_id: id.clone() });
                Ok(book)
            })
            .await
    }

    // ---- DeleteBook -----------------------------------------------------

    /// Soft-deletes a book (§6.2: hard delete is not exposed at this
    /// layer).
    ///
    /// # Errors
    ///
    /// Returns a validation error if `soft` is `false`, or a store error on
    /// read/write failure.
    pub async fn delete_book(
        &self,
        id: &str,
        soft: bool,
        prevent_reimport: bool,
        reason: Option<String>,
    ) -> Result<()> {
        if !soft {
            return Err(AppError::validation("soft", "hard delete is not exposed by the engine"));
        }
        let store = Arc::clone(&self.shared.store);
        let events = self.shared.events.clone();
        let id = id.to_string();
        self.shared
            .with_book_lock(&id, move || {
                state_machine::soft_delete(&store, &id, prevent_reimport, reason.as_deref())?;
                events.publish(DomainEvent::BookDeleted { book_id: id.clone() });
                Ok(())
            })
            .await
    }

    // ---- RestoreBook ----------------------------------------------------

    /// # Errors
    ///
    /// Returns [`AppError::IllegalStateTransition`] if `id` isn't currently
    /// deleted.
    pub async fn restore_book(&self, id: &str) -> Result<Book> {
        let store = Arc::clone(&self.shared.store);
        let events = self.shared.events.clone();
        let id = id.to_string();
        self.shared
            .with_book_lock(&id, move || {
                let book = state_machine::restore(&store, &id)?;
                events.publish(DomainEvent::BookRestored { book_id: id.clone() });
                Ok(book)
            })
            .await
    }

    // ---- StartScan / StartOrganize / BulkFetchMetadata -----------------

    /// # Errors
    ///
    /// Returns a store error if the operation record can't be written.
    pub fn start_scan(&self, roots: Vec<String>) -> Result<String> {
        self.queue.submit(OperationKind::Scan { roots })
    }

    /// # Errors
    ///
    /// Returns a store error if the operation record can't be written.
    pub fn start_organize(&self, book_id: &str) -> Result<String> {
        self.queue.submit(OperationKind::Organize { book_id: book_id.to_string() })
    }

    /// # Errors
    ///
    /// Returns a store error if the operation record can't be written.
    pub fn bulk_fetch_metadata(&self, book_ids: Vec<String>, refresh_all: bool) -> Result<String> {
        self.queue.submit(OperationKind::BulkFetchMetadata { book_ids, refresh_all })
    }

    // ---- ImportFile (synchronous, §6.2) ---------------------------------

    /// Imports a single file synchronously: hashes, tags, parses, and
    /// classifies it exactly as the scanner would for one file, returning
    /// the book it was attached to (created or matched).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file can't be read, or a store error.
    pub async fn import_file(&self, path: &Path, options: ImportOptions) -> Result<String> {
        let book_id = import_one_file(&self.shared, path).await?;
        if options.organize_after {
            let config = self.shared.config_snapshot();
            let store = Arc::clone(&self.shared.store);
            let organize_config = config.organize_config();
            let id = book_id.clone();
            tokio::task::spawn_blocking(move || organizer::organize(&*store, &id, &organize_config, false))
                .await??;
        }
        Ok(book_id)
    }

    // ---- AddWanted -------------------------------------------------------

    /// # Errors
    ///
    /// Returns a store error on read/write failure.
    pub fn add_wanted(&self, kind: WantedKind) -> Result<Vec<String>> {
        let store = &*self.shared.store;
        match kind {
            WantedKind::Book { title, author } => {
                let mut book = Book::new_wanted(&title);
                if let Some(author) = author {
                    book.fields.entry(FieldName::Author).or_default().set_stored(Some(author));
                }
                repo::put_book(store, &book)?;
                self.shared.events.publish(DomainEvent::BookCreated { book_id: book.id.clone() });
                Ok(vec![book.id])
            }
            WantedKind::Author { name } => {
                let normalized = crate::models::book::normalize_title(&name);
                let author = match repo::find_author_by_name(store, &normalized)? {
                    Some(mut existing) => {
                        existing.wanted = true;
                        existing
                    }
                    None => {
                        let mut author = Author::new(&name);
                        author.wanted = true;
                        author
                    }
                };
                let id = author.id.clone();
                repo::put_author(store, &author)?;
                Ok(vec![id])
            }
            WantedKind::Series { title, author } => {
                let author_id = author
                    .map(|name| find_or_create_author(store, &name))
                    .transpose()?;
                let normalized = crate::models::book::normalize_title(&title);
                let series = match repo::find_series_by_title(store, author_id.as_deref().unwrap_or_default(), &normalized)? {
                    Some(mut existing) => {
                        existing.wanted = true;
                        existing
                    }
                    None => {
                        let mut series = Series::new(&title, author_id.clone());
                        series.wanted = true;
                        series
                    }
                };
                let id = series.id.clone();
                repo::put_series(store, &series)?;
                let mut ids = vec![id];
                if let Some(author_id) = author_id {
                    ids.push(author_id);
                }
                Ok(ids)
            }
        }
    }

    // ---- Operation inspection --------------------------------------------

    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if `id` doesn't resolve.
    pub fn get_operation(&self, id: &str) -> Result<Operation> {
        self.queue.get(id)?.ok_or_else(|| AppError::not_found("operation", id))
    }

    pub fn cancel_operation(&self, id: &str) {
        self.queue.cancel(id);
    }

    /// Streams `id`'s log, existing records first, then newly appended ones
    /// until the operation reaches a terminal status (§6.2 "finite when
    /// operation ends").
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if `id` doesn't resolve.
    pub fn stream_operation_logs(&self, id: &str) -> Result<ReceiverStream<LogRecord>> {
        self.queue.get(id)?.ok_or_else(|| AppError::not_found("operation", id))?;

        let (tx, rx) = mpsc::channel(256);
        let store = Arc::clone(&self.shared.store);
        let operation_id = id.to_string();
        tokio::spawn(async move {
            let mut last_sent = 0usize;
            loop {
                let Ok(logs) = repo::list_logs(&*store, &operation_id) else { break };
                for record in logs.iter().skip(last_sent) {
                    if tx.send(record.clone()).await.is_err() {
                        return;
                    }
                }
                last_sent = logs.len();

                match repo::get_operation(&*store, &operation_id) {
                    Ok(Some(operation)) if matches!(
                        operation.status,
                        crate::models::OperationStatus::Completed
                            | crate::models::OperationStatus::Failed
                            | crate::models::OperationStatus::Cancelled
                    ) => return,
                    Ok(Some(_)) => {}
                    _ => return,
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        });
        Ok(ReceiverStream::new(rx))
    }

    // ---- Blocked hashes ---------------------------------------------------

    /// # Errors
    ///
    /// Returns a store error on read failure.
    pub fn list_blocked_hashes(&self, page: PageRequest) -> Result<Page<BlockedHash>> {
        let mut hashes = repo::list_blocked_hashes(&*self.shared.store)?;
        hashes.sort_by(|a, b| a.blocked_at.cmp(&b.blocked_at));
        Ok(Page::slice(hashes, page))
    }

    /// # Errors
    ///
    /// Returns a validation error if `hash` is not 64-char lowercase hex.
    pub fn add_blocked_hash(&self, hash: &str, reason: &str) -> Result<()> {
        let blocked = BlockedHash::new(hash, reason)?;
        repo::put_blocked_hash(&*self.shared.store, &blocked)
    }

    /// # Errors
    ///
    /// Returns a store error on write failure.
    pub fn remove_blocked_hash(&self, hash: &str) -> Result<()> {
        repo::remove_blocked_hash(&*self.shared.store, hash)
    }

    // ---- FactoryReset -----------------------------------------------------

    /// Wipes the store; does not touch files on disk (§6.2).
    ///
    /// # Errors
    ///
    /// Returns a store error if the backend can't be wiped.
    pub fn factory_reset(&self) -> Result<()> {
        Ok(self.shared.store.wipe()?)
    }

    // ---- AutoWatcher (§4.12) --------------------------------------------

    /// Builds an [`AutoWatcher`] over this engine's operation queue, using
    /// a real `notify`-backed filesystem watcher. The caller is
    /// responsible for calling [`AutoWatcher::watch`] on the configured
    /// `import_paths` and spawning [`AutoWatcher::run`] as a background
    /// task; the engine itself stays transport-agnostic and does not start
    /// watching on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform's file-watching backend can't be
    /// initialized.
    pub fn auto_watcher(&self) -> Result<crate::watcher::AutoWatcher> {
        let watcher: Arc<dyn crate::capabilities::FilesystemWatcher> =
            Arc::new(crate::capabilities::NotifyFilesystemWatcher::new()?);
        Ok(crate::watcher::AutoWatcher::new(watcher, self.queue.clone()))
    }

    /// Builds a [`PurgeScheduler`](crate::purge::PurgeScheduler) bound to
    /// this engine's store and queue, using the configured retention
    /// window. As with [`Engine::auto_watcher`], the caller decides
    /// whether to spawn [`PurgeScheduler::run`](crate::purge::PurgeScheduler::run)
    /// as a background task.
    #[must_use]
    pub fn purge_scheduler(&self) -> crate::purge::PurgeScheduler {
        let retention_days = self.shared.config_snapshot().purge_soft_deleted_after_days;
        crate::purge::PurgeScheduler::with_schedule(
            Arc::clone(&self.shared.store),
            self.queue.clone(),
            Duration::from_secs(crate::constants::DEFAULT_PURGE_INTERVAL_SECONDS),
            retention_days,
        )
    }

    // ---- BrowseFilesystem ---------------------------------------------------

    /// Read-only directory listing for UI navigation (§6.2, §6.3): each
    /// entry carries permissions, size, an audio-file flag, and whether a
    /// directory directly holds an exclude sentinel.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `path` cannot be read.
    pub async fn browse_filesystem(&self, path: &Path) -> Result<Vec<FilesystemEntry>> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || browse_filesystem_sync(&path)).await?
    }
}

fn find_or_create_author(store: &dyn Store, name: &str) -> Result<String> {
    let normalized = crate::models::book::normalize_title(name);
    if let Some(existing) = repo::find_author_by_name(store, &normalized)? {
        return Ok(existing.id);
    }
    let author = Author::new(name);
    let id = author.id.clone();
    repo::put_author(store, &author)?;
    Ok(id)
}

fn browse_filesystem_sync(path: &Path) -> Result<Vec<FilesystemEntry>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(path).map_err(|e| AppError::io(path.to_string_lossy(), e))? {
        let entry = entry.map_err(|e| AppError::io(path.to_string_lossy(), e))?;
        let metadata = entry.metadata().map_err(|e| AppError::io(path.to_string_lossy(), e))?;
        let entry_path = entry.path();
        let is_dir = metadata.is_dir();
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_audio_file = !is_dir
            && entry_path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .is_some_and(|ext| DEFAULT_SUPPORTED_EXTENSIONS.contains(&ext.as_str()));
        let excluded = is_dir && entry_path.join(crate::constants::EXCLUDE_SENTINEL).is_file();

        entries.push(FilesystemEntry {
            name,
            path: entry_path,
            is_dir,
            size_bytes: (!is_dir).then_some(metadata.len()),
            readonly: metadata.permissions().readonly(),
            is_audio_file,
            excluded,
        });
    }
    entries.sort_by(|a, b| (!a.is_dir, &a.name).cmp(&(!b.is_dir, &b.name)));
    Ok(entries)
}

/// Hashes, tags, and classifies one file exactly as the scanner's
/// per-file pipeline would, without a directory walk (§6.2 `ImportFile`).
async fn import_one_file(shared: &Shared, path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path).await?;
    let size_bytes = metadata.len();

    let hash_path = path.to_path_buf();
    let content_hash = tokio::task::spawn_blocking(move || hash_file(&hash_path)).await??;
    let tags = shared.tag_reader.read_tags(path).await?;
    let format = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_lowercase();
    let parsed = filename_parser::parse(path);

    let candidate = DiscoveredBook {
        candidate_id: crate::ids::new_id(),
        files: vec![DiscoveredFile { path: path.to_path_buf(), size_bytes, format, content_hash, tags }],
        parsed,
    };

    let classification = dedup::classify(&*shared.store, &shared.events, &candidate)?;
    Ok(match classification {
        Classification::Blocked { hash, reason } => {
            return Err(AppError::validation("hash", format!("{hash} is blocked: {reason}")));
        }
        Classification::DuplicateExactPath { book_id }
        | Classification::DuplicateNewPath { book_id }
        | Classification::WantedMatch { book_id }
        | Classification::New { book_id } => book_id,
    })
}

/// Wires [`OperationKind`] variants to the scanner/dedup/organizer/
/// resolution/purge functions (§4.10, §6.2).
struct EngineDispatcher {
    shared: Arc<Shared>,
}

#[async_trait]
impl OperationDispatcher for EngineDispatcher {
    async fn dispatch(&self, kind: &OperationKind, ctx: OperationContext) -> Result<()> {
        match kind {
            OperationKind::Scan { roots } => self.run_scan(roots, &ctx).await,
            OperationKind::Organize { book_id } => self.run_organize(book_id, &ctx).await,
            OperationKind::BulkFetchMetadata { book_ids, refresh_all } => {
                self.run_bulk_fetch_metadata(book_ids, *refresh_all, &ctx).await
            }
            OperationKind::ImportFile { path } => self.run_import(path, &ctx).await,
            OperationKind::PurgeSoftDeleted => self.run_purge(&ctx).await,
            OperationKind::Restore { book_id } => self.run_restore(book_id, &ctx).await,
        }
    }
}

/// Adapts scan progress into the operation's rate-limited reporter (§4.10
/// "Progress" bridging the scanner's own progress model).
struct ScanProgressBridge {
    ctx: OperationContext,
}

#[async_trait]
impl ProgressReporter for ScanProgressBridge {
    async fn report(&self, progress: ScanProgress) {
        let snapshot = match progress {
            ScanProgress::Started { roots } => {
                Some(crate::models::OperationProgress { current: 0, total: roots as u64, message: "scan started".into() })
            }
            ScanProgress::FileSeen { total_seen } => {
                Some(crate::models::OperationProgress { current: total_seen as u64, total: 0, message: "seeing files".into() })
            }
            ScanProgress::BookIdentified { total_identified, title } => Some(crate::models::OperationProgress {
                current: total_identified as u64,
                total: 0,
                message: format!("identified: {title}"),
            }),
            ScanProgress::BytesHashed { .. } => None,
            ScanProgress::Complete { books_identified, errors, .. } => Some(crate::models::OperationProgress {
                current: books_identified as u64,
                total: books_identified as u64,
                message: format!("scan complete, {errors} errors"),
            }),
            ScanProgress::Cancelled { books_identified, .. } => Some(crate::models::OperationProgress {
                current: books_identified as u64,
                total: books_identified as u64,
                message: "scan cancelled".into(),
            }),
        };
        if let Some(progress) = snapshot {
            let _ = self.ctx.reporter.report(progress, false);
        }
    }
}

impl EngineDispatcher {
    async fn run_scan(&self, roots: &[String], ctx: &OperationContext) -> Result<()> {
        let config = self.shared.config_snapshot();
        let discoverer = Arc::new(DefaultFileDiscoverer::new(config.supported_extensions.clone()));
        let scanner = Scanner::new(discoverer, Arc::clone(&self.shared.tag_reader));
        let options = ScanOptions {
            roots: roots.iter().map(PathBuf::from).collect(),
            concurrent_scans: config.concurrent_scans,
        };

        let (tx, mut rx) = mpsc::channel::<DiscoveredBook>(32);
        let tasks = TaskManager::from_token(ctx.cancellation.clone());
        let reporter: Arc<dyn ProgressReporter> = Arc::new(ScanProgressBridge { ctx: ctx.clone() });

        let shared = Arc::clone(&self.shared);
        let operation_id = ctx.operation_id.clone();
        let consumer = tokio::spawn(async move {
            while let Some(candidate) = rx.recv().await {
                match dedup::classify(&*shared.store, &shared.events, &candidate) {
                    Ok(Classification::Blocked { hash, .. }) => {
                        shared.events.publish(DomainEvent::DedupBlocked {
                            hash,
                            path: candidate.files.first().map(|f| f.path.to_string_lossy().into_owned()).unwrap_or_default(),
                        });
                    }
                    Ok(_) => {}
                    Err(err) => {
                        let _ = repo::append_log(
                            &*shared.store,
                            &operation_id,
                            crate::models::LogLevel::Warn,
                            format!("failed to classify a scan candidate: {err}"),
                        );
                    }
                }
            }
        });

        let summary = scanner.scan(&options, tx, reporter, &tasks).await;
        consumer.await.map_err(AppError::from)?;
        summary.map(|_| ())
    }

    async fn run_organize(&self, book_id: &str, ctx: &OperationContext) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        let config = self.shared.config_snapshot();
        let store = Arc::clone(&self.shared.store);
        let book_locks = &self.shared.book_locks;
        let book_id = book_id.to_string();
        let lock = book_locks.entry(&book_id);
        let guard = lock.lock().await;
        let result = organizer::organize(&*store, &book_id, &config.organize_config(), false).map(|_| ());
        drop(guard);
        book_locks.vacate(&book_id, lock);
        result
    }

    async fn run_bulk_fetch_metadata(&self, book_ids: &[String], refresh_all: bool, ctx: &OperationContext) -> Result<()> {
        use futures::stream::StreamExt;

        let config = self.shared.config_snapshot();
        let policy = if refresh_all { ResolutionPolicy::RefreshAll } else { ResolutionPolicy::OnlyMissing };
        let timeout = Duration::from_secs(config.provider_call_timeout_seconds);
        let worker_count = config.operation_workers.max(1);
        let store = &*self.shared.store;
        let providers = &self.shared.providers;

        let mut completed = 0u64;
        let total = book_ids.len() as u64;
        // Tags each outcome with its own book id up front, since resolving
        // concurrently (buffer_unordered) doesn't preserve `book_ids`' order.
        let mut results = futures::stream::iter(book_ids.iter()).map(|book_id| async move {
            let changed = resolution::resolve(store, providers, book_id, policy, timeout, Some(&ctx.operation_id)).await;
            (book_id.clone(), changed)
        }).buffer_unordered(worker_count);

        while let Some((book_id, outcome)) = results.next().await {
            if ctx.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            completed += 1;
            ctx.reporter.report(
                crate::models::OperationProgress { current: completed, total, message: "resolving metadata".into() },
                false,
            )?;
            if let Ok(changed) = outcome {
                if !changed.is_empty() {
                    self.shared.events.publish(DomainEvent::MetadataUpdated {
                        book_id,
                        affected_fields: changed.iter().map(|f| format!("{f:?}")).collect(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn run_import(&self, path: &str, _ctx: &OperationContext) -> Result<()> {
        import_one_file(&self.shared, Path::new(path)).await.map(|_| ())
    }

    async fn run_purge(&self, ctx: &OperationContext) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        let config = self.shared.config_snapshot();
        let store = Arc::clone(&self.shared.store);
        let retention_days = config.purge_soft_deleted_after_days;
        let delete_files = config.purge_soft_deleted_delete_files;
        tokio::task::spawn_blocking(move || purge::purge_due_books(&*store, retention_days, delete_files))
            .await??;
        Ok(())
    }

    async fn run_restore(&self, book_id: &str, _ctx: &OperationContext) -> Result<()> {
        let store = Arc::clone(&self.shared.store);
        let events = self.shared.events.clone();
        let book_locks = &self.shared.book_locks;
        let book_id = book_id.to_string();
        let lock = book_locks.entry(&book_id);
        let guard = lock.lock().await;
        let result = state_machine::restore(&*store, &book_id).map(|_| ());
        drop(guard);
        book_locks.vacate(&book_id, lock);
        if result.is_ok() {
            events.publish(DomainEvent::BookRestored { book_id });
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn test_engine() -> Engine {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::default());
        Engine::with_defaults(store, Config::default()).unwrap()
    }

    #[tokio::test]
    async fn add_wanted_book_then_list_books_finds_it() {
        let engine = test_engine();
        let ids = engine
            .add_wanted(WantedKind::Book { title: "Neural Wraith".into(), author: None })
            .unwrap();
        assert_eq!(ids.len(), 1);

        let page = engine.list_books(&BookFilter::default(), PageRequest::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].library_state, LibraryState::Wanted);
    }

    #[tokio::test]
    async fn update_book_override_pins_the_effective_value() {
        let engine = test_engine();
        let ids = engine.add_wanted(WantedKind::Book { title: "Title".into(), author: None }).unwrap();
        let book_id = ids[0].clone();

        let mut fields = HashMap::new();
        fields.insert(FieldName::Author, FieldUpdate { value: Some("Pinned".into()), as_override: true });
        let updated = engine.update_book(&book_id, BookUpdate { fields, tags: None }).await.unwrap();
        assert_eq!(updated.effective(FieldName::Author).as_deref(), Some("Pinned"));
    }

    #[tokio::test]
    async fn delete_book_requires_soft_true() {
        let engine = test_engine();
        let ids = engine.add_wanted(WantedKind::Book { title: "Title".into(), author: None }).unwrap();
        let result = engine.delete_book(&ids[0], false, false, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn add_blocked_hash_then_remove_round_trips() {
        let engine = test_engine();
        let hash = "a".repeat(64);
        engine.add_blocked_hash(&hash, "test").unwrap();
        assert_eq!(engine.list_blocked_hashes(PageRequest::default()).unwrap().total, 1);

        engine.remove_blocked_hash(&hash).unwrap();
        assert_eq!(engine.list_blocked_hashes(PageRequest::default()).unwrap().total, 0);
    }

    #[tokio::test]
    async fn factory_reset_wipes_every_book() {
        let engine = test_engine();
        engine.add_wanted(WantedKind::Book { title: "Title".into(), author: None }).unwrap();
        engine.factory_reset().unwrap();
        assert_eq!(engine.list_books(&BookFilter::default(), PageRequest::default()).unwrap().total, 0);
    }

    #[tokio::test]
    async fn browse_filesystem_flags_audio_files_and_sentinels() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("book.mp3"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("excluded")).unwrap();
        std::fs::write(dir.path().join("excluded").join(".jabexclude"), b"").unwrap();

        let engine = test_engine();
        let entries = engine.browse_filesystem(dir.path()).await.unwrap();

        let book = entries.iter().find(|e| e.name == "book.mp3").unwrap();
        assert!(book.is_audio_file);
        let excluded_dir = entries.iter().find(|e| e.name == "excluded").unwrap();
        assert!(excluded_dir.excluded);
    }
}
