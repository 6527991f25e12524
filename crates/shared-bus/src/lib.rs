//! # Shared Bus - Cart Notification Surface
//!
//! Fans cart change notifications out to any number of listeners (UI,
//! persistence, analytics) without the cart knowing who listens.
//!
//! ## Delivery Rules
//!
//! - Events are published only after the cart has committed the change.
//! - Events from one mutation are published in the order they happened.
//! - Listeners filter by [`EventTopic`]; slow listeners lag and skip, they
//!   never block the cart.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Shopping     │                    │ Persistence  │
//! │ Cart         │    publish()       │ / UI         │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{CartEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus, NoOpPublisher};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
