//! The Scanner (§4.3): walks configured roots and turns files into
//! [`DiscoveredBook`] candidates for the dedup engine.

use super::discovered::{DiscoveredBook, DiscoveredFile};
use super::discovery::FileDiscoverer;
use super::grouping::group_files;
use super::progress::{ProgressReporter, ScanProgress};
use super::task_manager::TaskManager;
use crate::capabilities::AudioTagReader;
use crate::error::{AppError, Result};
use crate::filename_parser;
use crate::hash::hash_file;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// What roots to walk; extensions come from the discoverer.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub roots: Vec<PathBuf>,
    /// Bound on how many files are hashed/tag-read in parallel within a
    /// group (§5 "the scanner ... hashes and reads tags from multiple
    /// files in parallel up to a configurable bound").
    pub concurrent_scans: usize,
}

/// Summary returned once a scan finishes or is cancelled.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub books_identified: usize,
    pub files_seen: usize,
    pub errors: usize,
    pub duration: std::time::Duration,
}

/// Walks roots, groups files, and emits [`DiscoveredBook`] candidates to
/// `sink` as they're produced — the "stream" in the §4.3 contract. A file
/// failure is logged and skipped (the group continues without it); a root
/// failure aborts only that root.
pub struct Scanner {
    discoverer: Arc<dyn FileDiscoverer>,
    tag_reader: Arc<dyn AudioTagReader>,
}

impl Scanner {
    #[must_use]
    pub fn new(discoverer: Arc<dyn FileDiscoverer>, tag_reader: Arc<dyn AudioTagReader>) -> Self {
        Self {
            discoverer,
            tag_reader,
        }
    }

    /// # Errors
    ///
    /// Returns [`AppError::Cancelled`] if `tasks` is cancelled mid-scan.
    /// Per-file and per-root failures are recorded in the returned summary
    /// and reported through `reporter`, not returned as an error.
    pub async fn scan(
        &self,
        options: &ScanOptions,
        sink: mpsc::Sender<DiscoveredBook>,
        reporter: Arc<dyn ProgressReporter>,
        tasks: &TaskManager,
    ) -> Result<ScanSummary> {
        let start = Instant::now();
        reporter
            .report(ScanProgress::Started {
                roots: options.roots.len(),
            })
            .await;

        let mut files_seen = 0usize;
        let mut books_identified = 0usize;
        let mut errors = 0usize;
        let bytes_hashed = AtomicU64::new(0);

        for root in &options.roots {
            if tasks.is_cancelled() {
                return self.cancelled(books_identified, start, reporter).await;
            }

            let files = match self.discoverer.discover_files(root).await {
                Ok(files) => files,
                Err(err) => {
                    warn!(root = %root.display(), error = %err, "scan root aborted");
                    errors += 1;
                    continue;
                }
            };
            files_seen += files.len();
            reporter
                .report(ScanProgress::FileSeen { total_seen: files_seen })
                .await;

            for group in group_files(&files) {
                if tasks.is_cancelled() {
                    return self.cancelled(books_identified, start, reporter).await;
                }

                match self.identify_group(&group, &bytes_hashed, options.concurrent_scans).await {
                    Ok(book) => {
                        books_identified += 1;
                        reporter
                            .report(ScanProgress::BookIdentified {
                                total_identified: books_identified,
                                title: book.parsed.title.clone(),
                            })
                            .await;
                        reporter
                            .report(ScanProgress::BytesHashed {
                                total_bytes: bytes_hashed.load(Ordering::Relaxed),
                            })
                            .await;
                        if sink.send(book).await.is_err() {
                            info!("scan sink closed, stopping early");
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to identify a file group, skipping");
                        errors += 1;
                    }
                }
            }
        }

        let duration = start.elapsed();
        reporter
            .report(ScanProgress::Complete {
                books_identified,
                errors,
                duration,
            })
            .await;

        Ok(ScanSummary {
            books_identified,
            files_seen,
            errors,
            duration,
        })
    }

    async fn cancelled(
        &self,
        books_identified: usize,
        start: Instant,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<ScanSummary> {
        let duration = start.elapsed();
        reporter
            .report(ScanProgress::Cancelled {
                books_identified,
                duration,
            })
            .await;
        Err(AppError::Cancelled)
    }

    /// Hashes, tags, and parses every file in one group, isolating a single
    /// file's failure (§4.3 "Failure semantics") by skipping it rather than
    /// failing the whole group, as long as at least one file survives.
    /// Files within the group are hashed/tag-read concurrently, bounded by
    /// `concurrent_scans`.
    async fn identify_group(
        &self,
        group: &[PathBuf],
        bytes_hashed: &AtomicU64,
        concurrent_scans: usize,
    ) -> Result<DiscoveredBook> {
        use futures::stream::StreamExt;

        let results = futures::stream::iter(group.iter())
            .map(|path| async move { (path, self.identify_file(path, bytes_hashed).await) })
            .buffer_unordered(concurrent_scans.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut files = Vec::with_capacity(group.len());
        for (path, result) in results {
            match result {
                Ok(file) => files.push(file),
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable file"),
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let primary = files.first().map_or_else(
            || group.first().map_or_else(PathBuf::new, Clone::clone),
            |f| f.path.clone(),
        );
        if files.is_empty() {
            return Err(AppError::io(primary.to_string_lossy(), "no file in group was readable"));
        }

        let parsed = filename_parser::parse(&primary);
        Ok(DiscoveredBook {
            candidate_id: crate::ids::new_id(),
            files,
            parsed,
        })
    }

    async fn identify_file(&self, path: &Path, bytes_hashed: &AtomicU64) -> Result<DiscoveredFile> {
        let metadata = tokio::fs::metadata(path).await?;
        let size_bytes = metadata.len();

        let hash_path = path.to_path_buf();
        let content_hash = tokio::task::spawn_blocking(move || hash_file(&hash_path)).await??;
        bytes_hashed.fetch_add(size_bytes, Ordering::Relaxed);

        let tags = self.tag_reader.read_tags(path).await?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        Ok(DiscoveredFile {
            path: path.to_path_buf(),
            size_bytes,
            format,
            content_hash,
            tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::discovery::DefaultFileDiscoverer;
    use crate::scanner::progress::TestReporter;
    use crate::test_support::FakeAudioTagReader;
    use std::fs;
    use tempfile::tempdir;

    fn scanner() -> Scanner {
        Scanner::new(
            Arc::new(DefaultFileDiscoverer::with_default_extensions()),
            Arc::new(FakeAudioTagReader::default()),
        )
    }

    #[tokio::test]
    async fn scans_a_flat_directory_into_one_book_per_title() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Neural Wraith.mp3"), b"abc").unwrap();
        fs::write(dir.path().join("Other Book.mp3"), b"def").unwrap();

        let options = ScanOptions {
            roots: vec![dir.path().to_path_buf()],
            concurrent_scans: 4,
        };
        let (tx, mut rx) = mpsc::channel(10);
        let reporter = Arc::new(TestReporter::default());
        let tasks = TaskManager::new();

        let summary = scanner()
            .scan(&options, tx, reporter, &tasks)
            .await
            .unwrap();

        assert_eq!(summary.books_identified, 2);
        assert_eq!(summary.files_seen, 2);
        assert_eq!(summary.errors, 0);

        let mut seen = Vec::new();
        while let Some(book) = rx.recv().await {
            seen.push(book);
        }
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn groups_a_multi_track_book_into_one_candidate() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Neural Wraith Track 01.mp3"), b"abc").unwrap();
        fs::write(dir.path().join("Neural Wraith Track 02.mp3"), b"def").unwrap();

        let options = ScanOptions {
            roots: vec![dir.path().to_path_buf()],
            concurrent_scans: 4,
        };
        let (tx, mut rx) = mpsc::channel(10);
        let reporter = Arc::new(TestReporter::default());
        let tasks = TaskManager::new();

        let summary = scanner()
            .scan(&options, tx, reporter, &tasks)
            .await
            .unwrap();

        assert_eq!(summary.books_identified, 1);
        let book = rx.recv().await.unwrap();
        assert_eq!(book.files.len(), 2);
    }

    #[tokio::test]
    async fn an_inaccessible_root_is_logged_and_does_not_abort_the_scan() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("fine.mp3"), b"abc").unwrap();

        let options = ScanOptions {
            roots: vec![PathBuf::from("/definitely/not/a/real/path"), dir.path().to_path_buf()],
            concurrent_scans: 4,
        };
        let (tx, mut rx) = mpsc::channel(10);
        let reporter = Arc::new(TestReporter::default());
        let tasks = TaskManager::new();

        let summary = scanner()
            .scan(&options, tx, reporter, &tasks)
            .await
            .unwrap();

        assert_eq!(summary.books_identified, 1);
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn cancellation_stops_the_scan_early() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.mp3"), b"abc").unwrap();

        let options = ScanOptions {
            roots: vec![dir.path().to_path_buf()],
            concurrent_scans: 4,
        };
        let (tx, _rx) = mpsc::channel(10);
        let reporter = Arc::new(TestReporter::default());
        let tasks = TaskManager::new();
        tasks.cancel();

        let result = scanner().scan(&options, tx, reporter, &tasks).await;
        assert!(matches!(result, Err(AppError::Cancelled)));
    }
}
