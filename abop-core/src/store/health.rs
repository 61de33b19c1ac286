//! Connection health tracking for the store capability.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionHealth {
    Healthy,
    Degraded,
    Failed,
}

impl ConnectionHealth {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Tracks the most recent health observation and throttles how often a
/// caller should re-check (a full round-trip query) versus trust the cache.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    status: Arc<RwLock<ConnectionHealth>>,
    last_check: Arc<RwLock<Instant>>,
    check_interval: Duration,
}

impl HealthMonitor {
    #[must_use]
    pub fn new(check_interval: Duration) -> Self {
        Self {
            status: Arc::new(RwLock::new(ConnectionHealth::Healthy)),
            last_check: Arc::new(RwLock::new(Instant::now())),
            check_interval,
        }
    }

    #[must_use]
    pub fn status(&self) -> ConnectionHealth {
        *self.status.read().expect("health lock poisoned")
    }

    pub fn record(&self, status: ConnectionHealth) {
        *self.status.write().expect("health lock poisoned") = status;
        *self.last_check.write().expect("health lock poisoned") = Instant::now();
    }

    #[must_use]
    pub fn should_check(&self) -> bool {
        self.last_check
            .read()
            .expect("health lock poisoned")
            .elapsed()
            >= self.check_interval
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_healthy_and_records_transitions() {
        let monitor = HealthMonitor::default();
        assert_eq!(monitor.status(), ConnectionHealth::Healthy);

        monitor.record(ConnectionHealth::Failed);
        assert_eq!(monitor.status(), ConnectionHealth::Failed);
        assert!(!monitor.status().is_healthy());
    }

    #[test]
    fn should_check_respects_interval() {
        let monitor = HealthMonitor::new(Duration::from_millis(0));
        assert!(monitor.should_check());
        monitor.record(ConnectionHealth::Healthy);
    }
}
