//! Progress reporting for scan operations (§4.3 "Ordering").

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// One step of scan progress, as reported to the host operation.
#[derive(Debug, Clone)]
pub enum ScanProgress {
    /// A root has started walking.
    Started { roots: usize },
    /// A file was seen during the walk (before hashing/tagging).
    FileSeen { total_seen: usize },
    /// A group of files was hashed, tagged, and turned into a candidate.
    BookIdentified { total_identified: usize, title: String },
    /// Bytes hashed so far across the whole scan.
    BytesHashed { total_bytes: u64 },
    /// The scan finished.
    Complete {
        books_identified: usize,
        errors: usize,
        duration: Duration,
    },
    /// The scan was cancelled partway through.
    Cancelled { books_identified: usize, duration: Duration },
}

/// Sink for [`ScanProgress`] events. Implementations should not block the
/// scan on slow consumers; `ChannelReporter` relies on a bounded channel
/// and drops the update rather than stalling the scanner.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, progress: ScanProgress);
}

/// Sends updates over a channel, as consumed by the operation log.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::Sender<ScanProgress>,
}

impl ChannelReporter {
    #[must_use]
    pub const fn new(tx: mpsc::Sender<ScanProgress>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ProgressReporter for ChannelReporter {
    async fn report(&self, progress: ScanProgress) {
        let _ = self.tx.try_send(progress);
    }
}

/// Calls back with the raw event; used by CLI progress bars.
pub struct CallbackReporter<F> {
    callback: Arc<F>,
}

impl<F> CallbackReporter<F>
where
    F: Fn(&ScanProgress) + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(callback: F) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }
}

#[async_trait]
impl<F> ProgressReporter for CallbackReporter<F>
where
    F: Fn(&ScanProgress) + Send + Sync + 'static,
{
    async fn report(&self, progress: ScanProgress) {
        (self.callback)(&progress);
    }
}

/// Collects every update in memory; used by tests.
#[derive(Debug, Clone, Default)]
pub struct TestReporter {
    updates: Arc<tokio::sync::Mutex<Vec<ScanProgress>>>,
}

#[async_trait]
impl ProgressReporter for TestReporter {
    async fn report(&self, progress: ScanProgress) {
        self.updates.lock().await.push(progress);
    }
}

impl TestReporter {
    pub async fn updates(&self) -> Vec<ScanProgress> {
        self.updates.lock().await.clone()
    }
}

/// A reporter that discards every update, for callers that don't care.
#[derive(Debug, Clone, Default)]
pub struct NullReporter;

#[async_trait]
impl ProgressReporter for NullReporter {
    async fn report(&self, _progress: ScanProgress) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_reporter_forwards_events() {
        let (tx, mut rx) = mpsc::channel(10);
        let reporter = ChannelReporter::new(tx);

        reporter.report(ScanProgress::Started { roots: 1 }).await;
        assert!(matches!(rx.recv().await, Some(ScanProgress::Started { roots: 1 })));
    }

    #[tokio::test]
    async fn test_reporter_collects_in_order() {
        let reporter = TestReporter::default();
        reporter.report(ScanProgress::FileSeen { total_seen: 1 }).await;
        reporter.report(ScanProgress::FileSeen { total_seen: 2 }).await;

        let updates = reporter.updates().await;
        assert_eq!(updates.len(), 2);
    }
}
