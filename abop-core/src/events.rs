//! The EventBus (§4.11): best-effort, in-process pub/sub for
//! [`crate::models::DomainEvent`]. Built on a broadcast channel, so a slow
//! subscriber falls behind and misses events (it gets a `Lagged` error on
//! its next `recv`) instead of blocking a fast one (§5 "Shared resources").

use crate::models::DomainEvent;
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 1024;

/// Shared publish handle. Cheap to clone; every clone publishes onto the
/// same underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes `event` to every current subscriber. A publish with zero
    /// subscribers is not an error — it's simply dropped.
    pub fn publish(&self, event: DomainEvent) {
        trace!(kind = event.kind(), "publishing domain event");
        let _ = self.tx.send(event);
    }

    /// Subscribes to future events. Events published before this call are
    /// not replayed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_each_receive_published_events() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(DomainEvent::BookCreated { book_id: "b1".into() });

        assert!(matches!(first.recv().await.unwrap(), DomainEvent::BookCreated { .. }));
        assert!(matches!(second.recv().await.unwrap(), DomainEvent::BookCreated { .. }));
    }

    #[tokio::test]
    async fn a_lagging_subscriber_does_not_block_publish() {
        let bus = EventBus::with_capacity(2);
        let mut lagging = bus.subscribe();

        for i in 0..10 {
            bus.publish(DomainEvent::BookUpdated { book_id: format!("b{i}") });
        }

        // The lagging subscriber missed messages but the bus kept working.
        let result = lagging.recv().await;
        assert!(matches!(result, Err(broadcast::error::RecvError::Lagged(_))));
    }

    #[test]
    fn publishing_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(DomainEvent::BookCreated { book_id: "b1".into() });
    }
}
