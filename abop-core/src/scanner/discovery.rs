//! Directory walking and extension filtering (§4.3 steps 1-2).

use super::constants::{EXCLUDE_SENTINEL, SUPPORTED_AUDIO_EXTENSIONS};
use crate::error::Result;
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Walks one root and returns the audio files found, in filesystem order.
#[async_trait]
pub trait FileDiscoverer: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if spawning the blocking walk fails. Per-entry
    /// read errors are logged and skipped, not surfaced.
    async fn discover_files(&self, root: &Path) -> Result<Vec<PathBuf>>;
}

/// `walkdir`-backed discoverer. Skips any directory (and everything under
/// it) that contains a sentinel file named [`EXCLUDE_SENTINEL`].
#[derive(Debug, Clone)]
pub struct DefaultFileDiscoverer {
    extensions: Vec<String>,
}

impl DefaultFileDiscoverer {
    #[must_use]
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    #[must_use]
    pub fn with_default_extensions() -> Self {
        Self::new(
            SUPPORTED_AUDIO_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
        )
    }

    fn is_excluded_dir(path: &Path) -> bool {
        path.join(EXCLUDE_SENTINEL).is_file()
    }

    fn find_audio_files_sync(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| !(entry.file_type().is_dir() && Self::is_excluded_dir(entry.path())))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "error reading directory entry during scan");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let path = entry.into_path();
                let ext = path
                    .extension()
                    .and_then(OsStr::to_str)
                    .map(str::to_lowercase)?;
                extensions.contains(&ext).then_some(path)
            })
            .collect()
    }
}

impl Default for DefaultFileDiscoverer {
    fn default() -> Self {
        Self::with_default_extensions()
    }
}

#[async_trait]
impl FileDiscoverer for DefaultFileDiscoverer {
    async fn discover_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let root = root.to_path_buf();
        let extensions = self.extensions.clone();
        debug!(root = %root.display(), "walking scan root");
        let files = tokio::task::spawn_blocking(move || {
            Self::find_audio_files_sync(&root, &extensions)
        })
        .await?;
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn discovers_only_configured_extensions() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.mp3"), b"x").unwrap();
        fs::write(dir.path().join("b.m4b"), b"x").unwrap();
        fs::write(dir.path().join("c.txt"), b"x").unwrap();

        let discoverer = DefaultFileDiscoverer::with_default_extensions();
        let files = discoverer.discover_files(dir.path()).await.unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|p| p.extension().unwrap() == "mp3"));
        assert!(files.iter().any(|p| p.extension().unwrap() == "m4b"));
    }

    #[tokio::test]
    async fn skips_directories_marked_with_sentinel() {
        let dir = tempdir().unwrap();
        let excluded = dir.path().join("excluded");
        fs::create_dir(&excluded).unwrap();
        fs::write(excluded.join(EXCLUDE_SENTINEL), b"").unwrap();
        fs::write(excluded.join("hidden.mp3"), b"x").unwrap();
        fs::write(dir.path().join("visible.mp3"), b"x").unwrap();

        let discoverer = DefaultFileDiscoverer::with_default_extensions();
        let files = discoverer.discover_files(dir.path()).await.unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("visible.mp3"));
    }
}
