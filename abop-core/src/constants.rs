//! Constants shared across the engine.

/// Configuration-related constants.
pub mod config {
    /// Configuration file name under the platform config directory.
    pub const CONFIG_FILE: &str = "config.toml";
}

/// Sentinel file name that excludes its containing directory (and
/// subdirectories) from the scanner, per §4.3 and §6.3.
pub const EXCLUDE_SENTINEL: &str = ".jabexclude";

/// Directory names that the filename parser refuses to treat as an author
/// when falling back to the parent directory (§4.2 step 3).
pub const PARENT_DIR_SKIP_SET: &[&str] = &[
    "books",
    "audiobooks",
    "newbooks",
    "downloads",
    "media",
    "audio",
    "library",
    "collection",
    "bt",
    "incomplete",
    "data",
];

/// Default audio file extensions recognized by the scanner.
pub const DEFAULT_SUPPORTED_EXTENSIONS: &[&str] =
    &["m4b", "mp3", "m4a", "flac", "ogg", "aac", "wma", "opus"];

/// Default number of files hashed/tag-read concurrently within one scan.
pub const DEFAULT_CONCURRENT_SCANS: usize = 2;

/// Default number of parallel operation-queue workers.
pub const DEFAULT_OPERATION_WORKERS: usize = 2;

/// Default per-provider call timeout, in seconds.
pub const DEFAULT_PROVIDER_TIMEOUT_SECONDS: u64 = 10;

/// Default soft-delete retention, in days, before the purge scheduler acts.
pub const DEFAULT_PURGE_RETENTION_DAYS: i64 = 30;

/// Default auto-watcher debounce window, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 2_000;

/// Default purge-scheduler wake interval, in seconds (24h).
pub const DEFAULT_PURGE_INTERVAL_SECONDS: u64 = 24 * 60 * 60;

/// Maximum pagination page size accepted by list operations (§8 boundary
/// behaviors: `limit=∞` clamps to this value).
pub const MAX_PAGE_LIMIT: usize = 1000;

/// Default pagination page size when the caller doesn't specify one.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Ceiling on progress notifications published per operation per second
/// (§4.10).
pub const MAX_PROGRESS_UPDATES_PER_SECOND: u32 = 5;
