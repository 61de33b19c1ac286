//! The worker pool that pulls queued operations and runs them through a
//! dispatcher (§4.10 "Model").

use crate::constants::DEFAULT_OPERATION_WORKERS;
use crate::error::{AppError, Result};
use crate::events::EventBus;
use crate::models::{DomainEvent, LogLevel, Operation, OperationKind, OperationStatus};
use crate::operations::dispatch::{OperationContext, OperationDispatcher};
use crate::operations::reporter::RateLimitedReporter;
use crate::repo;
use crate::store::Store;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// A persisted, worker-pooled queue of [`Operation`]s.
///
/// Cloning shares the same workers and in-flight cancellation registry.
#[derive(Clone)]
pub struct OperationQueue {
    store: Arc<dyn Store>,
    events: EventBus,
    dispatcher: Arc<dyn OperationDispatcher>,
    submit: mpsc::UnboundedSender<String>,
    cancellations: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl OperationQueue {
    /// Spawns `worker_count` worker tasks (default
    /// [`DEFAULT_OPERATION_WORKERS`]) and returns a queue ready for
    /// `submit`. Call [`OperationQueue::recover`] once at startup before
    /// accepting new submissions.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, events: EventBus, dispatcher: Arc<dyn OperationDispatcher>) -> Self {
        Self::with_worker_count(store, events, dispatcher, DEFAULT_OPERATION_WORKERS)
    }

    #[must_use]
    pub fn with_worker_count(
        store: Arc<dyn Store>,
        events: EventBus,
        dispatcher: Arc<dyn OperationDispatcher>,
        worker_count: usize,
    ) -> Self {
        let (submit, receiver) = mpsc::unbounded_channel::<String>();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let cancellations = Arc::new(Mutex::new(HashMap::new()));

        let queue = Self { store, events, dispatcher, submit, cancellations };

        for worker in 0..worker_count.max(1) {
            let queue = queue.clone();
            let receiver = Arc::clone(&receiver);
            tokio::spawn(async move {
                loop {
                    let next = receiver.lock().await.recv().await;
                    match next {
                        Some(operation_id) => queue.run(&operation_id).await,
                        None => break,
                    }
                }
                info!(worker, "operation queue worker shut down");
            });
        }

        queue
    }

    /// `running` operations at startup were interrupted by a process
    /// restart and can never complete; mark them `failed("interrupted")`
    /// (§4.10 "Persistence").
    ///
    /// # Errors
    ///
    /// Returns a store error on read/write failure.
    pub fn recover(store: &dyn Store) -> Result<usize> {
        let mut recovered = 0;
        for mut operation in repo::list_operations(store)? {
            if operation.status == OperationStatus::Running {
                operation.status = OperationStatus::Failed;
                operation.error = Some(AppError::Interrupted.to_string());
                operation.completed_at = Some(chrono::Utc::now());
                repo::put_operation(store, &operation)?;
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    /// Persists a new `Queued` operation and enqueues it for a worker.
    ///
    /// # Errors
    ///
    /// Returns a store error if the operation record can't be written.
    pub fn submit(&self, kind: OperationKind) -> Result<String> {
        let operation = Operation::new(kind);
        let id = operation.id.clone();
        repo::put_operation(&*self.store, &operation)?;
        self.cancellations.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(id.clone(), CancellationToken::new());
        // The receiving end only closes when every worker task has exited,
        // so a send failure here would mean the queue was torn down.
        let _ = self.submit.send(id.clone());
        Ok(id)
    }

    /// Signals cooperative cancellation for `operation_id`. The operation
    /// finishes its current unit of work and then stops (§4.10
    /// "Cancellation semantics").
    pub fn cancel(&self, operation_id: &str) {
        if let Some(token) = self.cancellations.lock().unwrap_or_else(std::sync::PoisonError::into_inner).get(operation_id) {
            token.cancel();
        }
    }

    /// # Errors
    ///
    /// Returns a store error on read failure.
    pub fn get(&self, operation_id: &str) -> Result<Option<Operation>> {
        repo::get_operation(&*self.store, operation_id)
    }

    /// # Errors
    ///
    /// Returns a store error on read failure.
    pub fn logs(&self, operation_id: &str) -> Result<Vec<crate::models::LogRecord>> {
        repo::list_logs(&*self.store, operation_id)
    }

    async fn run(&self, operation_id: &str) {
        let Ok(Some(mut operation)) = repo::get_operation(&*self.store, operation_id) else {
            error!(operation_id, "worker picked up an operation with no record");
            return;
        };

        let token = self
            .cancellations
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(operation_id)
            .cloned()
            .unwrap_or_default();

        operation.status = OperationStatus::Running;
        operation.started_at = Some(chrono::Utc::now());
        let _ = repo::put_operation(&*self.store, &operation);
        self.events.publish(DomainEvent::OperationStarted { operation_id: operation_id.to_string() });
        let _ = repo::append_log(&*self.store, operation_id, LogLevel::Info, "operation started");

        let ctx = OperationContext {
            operation_id: operation_id.to_string(),
            cancellation: token,
            reporter: Arc::new(RateLimitedReporter::new(Arc::clone(&self.store), self.events.clone(), operation_id.to_string())),
        };

        let result = self.dispatcher.dispatch(&operation.kind, ctx).await;

        operation.completed_at = Some(chrono::Utc::now());
        match result {
            Ok(()) => {
                operation.status = OperationStatus::Completed;
                self.events.publish(DomainEvent::OperationCompleted { operation_id: operation_id.to_string() });
                let _ = repo::append_log(&*self.store, operation_id, LogLevel::Info, "operation completed");
            }
            Err(AppError::Cancelled) => {
                operation.status = OperationStatus::Cancelled;
                self.events.publish(DomainEvent::OperationCancelled { operation_id: operation_id.to_string() });
                let _ = repo::append_log(&*self.store, operation_id, LogLevel::Info, "operation cancelled");
            }
            Err(other) => {
                let message = other.to_string();
                warn!(operation_id, error = %message, "operation failed");
                operation.status = OperationStatus::Failed;
                operation.error = Some(message.clone());
                self.events.publish(DomainEvent::OperationFailed { operation_id: operation_id.to_string(), error: message.clone() });
                let _ = repo::append_log(&*self.store, operation_id, LogLevel::Error, message);
            }
        }
        let _ = repo::put_operation(&*self.store, &operation);
        self.cancellations.lock().unwrap_or_else(std::sync::PoisonError::into_inner).remove(operation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingDispatcher {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl OperationDispatcher for CountingDispatcher {
        async fn dispatch(&self, _kind: &OperationKind, _ctx: OperationContext) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Other("boom".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn a_submitted_operation_runs_and_completes() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = Arc::new(CountingDispatcher { calls: Arc::clone(&calls), fail: false });
        let queue = OperationQueue::new(store, EventBus::new(), dispatcher);

        let id = queue.submit(OperationKind::PurgeSoftDeleted).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let operation = queue.get(&id).unwrap().unwrap();
        assert_eq!(operation.status, OperationStatus::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_failing_dispatch_marks_the_operation_failed() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::default());
        let dispatcher = Arc::new(CountingDispatcher { calls: Arc::new(AtomicUsize::new(0)), fail: true });
        let queue = OperationQueue::new(store, EventBus::new(), dispatcher);

        let id = queue.submit(OperationKind::PurgeSoftDeleted).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let operation = queue.get(&id).unwrap().unwrap();
        assert_eq!(operation.status, OperationStatus::Failed);
        assert!(operation.error.is_some());
    }

    #[test]
    fn recover_marks_running_operations_interrupted() {
        let store = MemoryStore::default();
        let mut operation = Operation::new(OperationKind::PurgeSoftDeleted);
        operation.status = OperationStatus::Running;
        repo::put_operation(&store, &operation).unwrap();

        let recovered = OperationQueue::recover(&store).unwrap();
        assert_eq!(recovered, 1);

        let reloaded = repo::get_operation(&store, &operation.id).unwrap().unwrap();
        assert_eq!(reloaded.status, OperationStatus::Failed);
    }
}
