//! AutoWatcher (§4.12): observes import directories and coalesces
//! create/rename bursts into a single `scan` operation per root. Never
//! scans directly — it only submits to the [`OperationQueue`].

use crate::capabilities::FilesystemWatcher;
use crate::constants::DEFAULT_DEBOUNCE_MS;
use crate::models::OperationKind;
use crate::operations::OperationQueue;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Watches `directory` and, per burst of events, enqueues one `scan`
/// operation against it after the debounce window elapses quietly.
pub struct AutoWatcher {
    watcher: Arc<dyn FilesystemWatcher>,
    queue: OperationQueue,
    debounce: Duration,
    pending: Arc<Mutex<HashMap<PathBuf, CancellationToken>>>,
}

impl AutoWatcher {
    #[must_use]
    pub fn new(watcher: Arc<dyn FilesystemWatcher>, queue: OperationQueue) -> Self {
        Self::with_debounce(watcher, queue, Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }

    #[must_use]
    pub fn with_debounce(watcher: Arc<dyn FilesystemWatcher>, queue: OperationQueue, debounce: Duration) -> Self {
        Self { watcher, queue, debounce, pending: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Starts watching `directory` for create/rename events (§4.12).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying watcher can't observe the path.
    pub async fn watch(&self, directory: &std::path::Path) -> crate::error::Result<()> {
        self.watcher.watch(directory).await
    }

    /// # Errors
    ///
    /// Returns an error if the underlying watcher can't release the path.
    pub async fn unwatch(&self, directory: &std::path::Path) -> crate::error::Result<()> {
        self.watcher.unwatch(directory).await
    }

    /// Drains watch events forever, debouncing per directory. Intended to
    /// be spawned as a background task; returns when the watcher's event
    /// stream ends.
    pub async fn run(self: Arc<Self>) {
        while let Some(event) = self.watcher.next_event().await {
            self.handle_event(event.directory).await;
        }
        info!("filesystem watch stream ended");
    }

    async fn handle_event(self: &Arc<Self>, directory: PathBuf) {
        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.insert(directory.clone(), CancellationToken::new()) {
            previous.cancel();
        }
        let token = pending.get(&directory).expect("just inserted").clone();
        drop(pending);

        let this = Arc::clone(self);
        let debounce = self.debounce;
        let spawned_directory = directory.clone();
        let _: JoinHandle<()> = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(directory = %spawned_directory.display(), "debounce reset by a later event");
                }
                () = tokio::time::sleep(debounce) => {
                    this.pending.lock().await.remove(&spawned_directory);
                    let root = spawned_directory.to_string_lossy().into_owned();
                    if let Err(err) = this.queue.submit(OperationKind::Scan { roots: vec![root] }) {
                        tracing::error!(%err, "failed to submit debounced scan");
                    }
                }
            }
        });
    }
}
