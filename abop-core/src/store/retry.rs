//! Retry logic for transient `SQLite` busy/locked errors.
//!
//! Configurable exponential backoff, applied around pooled-connection calls
//! so a writer holding the database momentarily doesn't surface as a hard
//! failure to callers.

use crate::store::error::StoreError;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 20,
            max_delay_ms: 1000,
            backoff_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Runs `operation`, retrying on busy/locked errors with exponential
    /// backoff. Any other error returns immediately.
    ///
    /// # Errors
    ///
    /// Returns the last error once `max_attempts` is exhausted, or
    /// immediately for non-retryable errors.
    pub fn execute<F, T>(&self, mut operation: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Result<T, StoreError>,
    {
        let mut attempt = 0;
        let mut delay = self.policy.initial_delay_ms;

        loop {
            match operation() {
                Ok(result) => return Ok(result),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.policy.max_attempts || !Self::is_retryable(&err) {
                        return Err(err);
                    }
                    thread::sleep(Duration::from_millis(delay));
                    delay = ((delay as f64) * self.policy.backoff_factor) as u64;
                    delay = delay.min(self.policy.max_delay_ms);
                }
            }
        }
    }

    fn is_retryable(err: &StoreError) -> bool {
        match err {
            StoreError::Backend(message) => {
                message.contains("database is locked") || message.contains("database is busy")
            }
            StoreError::ConnectionFailed(_) | StoreError::LockTimeout { .. } => true,
            StoreError::NotFound(_)
            | StoreError::MigrationFailed { .. }
            | StoreError::Serialization(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn retries_until_success() {
        let executor = RetryExecutor::new(RetryPolicy {
            max_attempts: 5,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_factor: 1.0,
        });
        let counter = AtomicU32::new(0);

        let result = executor.execute(|| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(StoreError::ConnectionFailed("retry me".into()))
            } else {
                Ok(())
            }
        });

        assert!(result.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn does_not_retry_not_found() {
        let executor = RetryExecutor::new(RetryPolicy::default());
        let counter = AtomicU32::new(0);

        let result: Result<(), StoreError> = executor.execute(|| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::NotFound("book:1".into()))
        });

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
