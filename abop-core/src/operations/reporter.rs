//! Progress reporting for running operations (§4.10 "Progress"): updates
//! are throttled to at most [`crate::constants::MAX_PROGRESS_UPDATES_PER_SECOND`]
//! per second so a tight per-file loop doesn't flood the event bus.

use crate::constants::MAX_PROGRESS_UPDATES_PER_SECOND;
use crate::error::Result;
use crate::events::EventBus;
use crate::models::{DomainEvent, OperationProgress};
use crate::repo;
use crate::store::Store;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Reports progress for a single operation, persisting the latest snapshot
/// and publishing it on the event bus, both throttled.
pub struct RateLimitedReporter {
    store: Arc<dyn Store>,
    events: EventBus,
    operation_id: String,
    last_sent: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimitedReporter {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, events: EventBus, operation_id: impl Into<String>) -> Self {
        Self {
            store,
            events,
            operation_id: operation_id.into(),
            last_sent: Mutex::new(None),
            min_interval: Duration::from_secs_f64(1.0 / f64::from(MAX_PROGRESS_UPDATES_PER_SECOND)),
        }
    }

    /// Records `progress`. Always persists the latest value (so a final
    /// read is never stale) but only publishes an event when the throttle
    /// window has elapsed, or when `force` is set (used for the
    /// start/completion transitions, which must never be dropped).
    ///
    /// # Errors
    ///
    /// Returns a store error if the operation record can't be updated.
    pub fn report(&self, progress: OperationProgress, force: bool) -> Result<()> {
        let mut operation = repo::get_operation(&*self.store, &self.operation_id)?
            .ok_or_else(|| crate::error::AppError::not_found("operation", &self.operation_id))?;
        operation.progress = progress.clone();
        repo::put_operation(&*self.store, &operation)?;

        if force || self.throttle_allows() {
            self.events.publish(DomainEvent::OperationProgress {
                operation_id: self.operation_id.clone(),
                current: progress.current,
                total: progress.total,
                message: progress.message,
            });
        }
        Ok(())
    }

    fn throttle_allows(&self) -> bool {
        let mut last_sent = self.last_sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let now = Instant::now();
        let allowed = last_sent.is_none_or(|last| now.duration_since(last) >= self.min_interval);
        if allowed {
            *last_sent = Some(now);
        }
        allowed
    }
}
