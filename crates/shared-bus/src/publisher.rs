//! # Event Publisher
//!
//! The cart publishes from its synchronous mutation methods, so publishing
//! must never wait on a listener.

use crate::events::{CartEvent, EventFilter};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

/// Sink for cart events.
pub trait EventPublisher: Send + Sync {
    /// Publish `event`. Returns how many listeners it was delivered to.
    fn publish(&self, event: CartEvent) -> usize;

    /// Total events handed to this publisher.
    fn events_published(&self) -> u64;
}

/// Broadcast bus for one cart.
///
/// Every listener sees every event; topic filtering happens on the
/// receiving side. A listener more than `capacity` events behind skips the
/// oldest ones.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<CartEvent>,
    published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Bus with [`DEFAULT_CHANNEL_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus buffering `capacity` events per listener (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Listen for events accepted by `filter`, starting now.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Like [`InMemoryEventBus::subscribe`], as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.sender.subscribe(), filter)
    }

    /// Live listeners.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Per-listener buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: CartEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let name = event.name();
        // Sending only fails when nobody listens, which is normal headless.
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!(event = name, delivered, "Cart event published");
        delivered
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

/// Publisher for carts nobody observes.
#[derive(Debug, Default)]
pub struct NoOpPublisher;

impl EventPublisher for NoOpPublisher {
    fn publish(&self, _event: CartEvent) -> usize {
        0
    }

    fn events_published(&self) -> u64 {
        0
    }
}
