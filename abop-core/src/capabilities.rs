//! External capabilities the engine depends on but does not own (§1 Non-goals):
//! reading audio tags, calling metadata providers, and watching the
//! filesystem. Each is a trait so tests can inject fakes
//! ([`crate::test_support`]) and the host binary wires in the real thing.

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Tag values an [`AudioTagReader`] can pull out of a file. Every field is
/// optional — most files are missing most tags.
#[derive(Debug, Clone, Default)]
pub struct TagValues {
    pub title: Option<String>,
    pub author: Option<String>,
    pub narrator: Option<String>,
    pub series: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub published_year: Option<String>,
    pub description: Option<String>,
    pub duration_seconds: Option<f64>,
    pub track_number: Option<u32>,
    pub total_tracks: Option<u32>,
}

/// Reads embedded metadata tags from an audio file.
#[async_trait]
pub trait AudioTagReader: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened; a file with no
    /// recognized tags is not an error, it returns `TagValues::default()`.
    async fn read_tags(&self, path: &Path) -> Result<TagValues>;
}

/// Reads `ID3` tags from MP3/WAV and `MP4` atoms from M4A/M4B, matching the
/// two extraction paths a real audiobook library has to support.
#[derive(Debug, Clone, Default)]
pub struct DefaultAudioTagReader;

#[async_trait]
impl AudioTagReader for DefaultAudioTagReader {
    async fn read_tags(&self, path: &Path) -> Result<TagValues> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::read_tags_sync(&path))
            .await
            .map_err(crate::error::AppError::from)?
    }
}

impl DefaultAudioTagReader {
    fn read_tags_sync(path: &Path) -> Result<TagValues> {
        match path.extension().and_then(|ext| ext.to_str()).map(str::to_lowercase).as_deref() {
            Some("mp3") => Ok(Self::read_id3(path)),
            Some("m4a" | "m4b") => Ok(Self::read_mp4(path)),
            _ => Ok(TagValues::default()),
        }
    }

    fn read_id3(path: &Path) -> TagValues {
        use id3::TagLike;
        let Ok(tag) = id3::Tag::read_from_path(path) else {
            return TagValues::default();
        };
        TagValues {
            title: tag.title().map(ToString::to_string),
            author: tag.artist().map(ToString::to_string),
            narrator: None,
            series: tag.album().map(ToString::to_string),
            publisher: None,
            language: None,
            isbn10: None,
            isbn13: None,
            published_year: tag.year().map(|y| y.to_string()),
            description: tag.comments().next().map(|c| c.text.clone()),
            duration_seconds: tag.duration().map(f64::from),
            track_number: tag.track(),
            total_tracks: tag.total_tracks(),
        }
    }

    fn read_mp4(path: &Path) -> TagValues {
        let Ok(tag) = mp4ameta::Tag::read_from_path(path) else {
            return TagValues::default();
        };
        TagValues {
            title: tag.title().map(ToString::to_string),
            author: tag.artist().map(ToString::to_string),
            narrator: tag.composer().map(ToString::to_string),
            series: tag.album().map(ToString::to_string),
            publisher: None,
            language: None,
            isbn10: None,
            isbn13: None,
            published_year: tag.year().map(ToString::to_string),
            description: tag.comment().map(ToString::to_string),
            duration_seconds: tag.duration().map(|d| d.as_secs_f64()),
            track_number: tag.track_number().map(u32::from),
            total_tracks: tag.total_tracks().map(u32::from),
        }
    }
}

/// A single search result from a metadata provider (§4.5).
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    pub source: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub narrator: Option<String>,
    pub series: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub published_year: Option<String>,
    pub description: Option<String>,
    pub cover_ref: Option<String>,
}

/// An external metadata source the resolution engine queries in priority
/// order. Out of scope (§1): the engine does not bundle any real provider
/// implementation, only this seam.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Stable identifier recorded as a field's fetched-value source.
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Returns an error on transport/parse failure. A provider with no
    /// match returns `Ok(None)`, not an error.
    async fn search_by_title_author(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> Result<Option<Candidate>>;

    /// # Errors
    ///
    /// Returns an error on transport/parse failure. A provider with no
    /// match returns `Ok(None)`, not an error.
    async fn get_by_isbn(&self, isbn: &str) -> Result<Option<Candidate>>;
}

/// A filesystem change the watcher observed.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub directory: std::path::PathBuf,
}

/// Watches directories for create/rename activity (§4.12). `notify`-backed
/// in production; a fake in tests drives it by hand.
#[async_trait]
pub trait FilesystemWatcher: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the directory cannot be watched (missing,
    /// permission denied).
    async fn watch(&self, directory: &Path) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the watch cannot be removed.
    async fn unwatch(&self, directory: &Path) -> Result<()>;

    /// Blocks until the next coalesced event arrives, or returns `None` if
    /// the watcher has shut down.
    async fn next_event(&self) -> Option<WatchEvent>;
}

/// `notify`-backed [`FilesystemWatcher`]: one `RecommendedWatcher` shared
/// across every watched root, forwarding create/rename events into an
/// unbounded channel [`AutoWatcher`](crate::watcher::AutoWatcher) drains.
pub struct NotifyFilesystemWatcher {
    watcher: std::sync::Mutex<notify::RecommendedWatcher>,
    events: tokio::sync::Mutex<tokio::sync::mpsc::UnboundedReceiver<WatchEvent>>,
}

impl NotifyFilesystemWatcher {
    /// # Errors
    ///
    /// Returns an error if the platform's native file-watching backend
    /// can't be initialized.
    pub fn new() -> Result<Self> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            let Ok(event) = result else { return };
            if !matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(notify::event::ModifyKind::Name(_))
            ) {
                return;
            }
            for path in event.paths {
                let directory = path.parent().map_or_else(|| path.clone(), std::path::Path::to_path_buf);
                let _ = tx.send(WatchEvent { directory });
            }
        })
        .map_err(|err| crate::error::AppError::Other(format!("failed to start filesystem watcher: {err}")))?;

        Ok(Self { watcher: std::sync::Mutex::new(watcher), events: tokio::sync::Mutex::new(rx) })
    }
}

#[async_trait]
impl FilesystemWatcher for NotifyFilesystemWatcher {
    async fn watch(&self, directory: &Path) -> Result<()> {
        use notify::Watcher;
        self.watcher
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .watch(directory, notify::RecursiveMode::Recursive)
            .map_err(|err| crate::error::AppError::io(directory.to_string_lossy(), err))
    }

    async fn unwatch(&self, directory: &Path) -> Result<()> {
        use notify::Watcher;
        self.watcher
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .unwatch(directory)
            .map_err(|err| crate::error::AppError::io(directory.to_string_lossy(), err))
    }

    async fn next_event(&self) -> Option<WatchEvent> {
        self.events.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_values_default_is_all_none() {
        let values = TagValues::default();
        assert!(values.title.is_none());
        assert!(values.author.is_none());
    }

    #[tokio::test]
    async fn notify_watcher_can_watch_and_unwatch_a_real_directory() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = NotifyFilesystemWatcher::new().unwrap();
        watcher.watch(dir.path()).await.unwrap();
        watcher.unwatch(dir.path()).await.unwrap();
    }
}
