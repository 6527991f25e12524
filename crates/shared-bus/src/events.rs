//! # Cart Events
//!
//! Defines all notifications that flow through the shared bus.
//! Every event is published after the state change it describes has been
//! committed, so a subscriber reading the cart sees the new state.

use serde::{Deserialize, Serialize};
use shared_types::{Cents, Taxation, ViolationNotification};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartEvent {
    // =========================================================================
    // ITEMS
    // =========================================================================
    /// An item was inserted.
    ItemAdded {
        /// Position of the new item.
        index: usize,
        /// Identifier of the new item.
        item_id: String,
    },

    /// An item was removed.
    ItemRemoved {
        /// Position the item had before removal.
        index: usize,
        /// Identifier of the removed item.
        item_id: String,
    },

    /// The quantity of an item changed (explicitly or by merging a scan).
    QuantityChanged {
        /// Position of the item.
        index: usize,
        /// Identifier of the item.
        item_id: String,
    },

    /// Products were replaced by the backend's version (SKU substitution).
    ProductsUpdated,

    // =========================================================================
    // PRICES
    // =========================================================================
    /// Online prices were applied or dropped.
    PricesUpdated,

    /// The shopper changed the tax treatment.
    TaxationChanged(Taxation),

    // =========================================================================
    // LIMITS
    // =========================================================================
    /// The cart total crossed the checkout limit.
    CheckoutLimitReached {
        /// Total at the time of crossing.
        total: Cents,
    },

    /// The cart total crossed the online payment limit.
    OnlinePaymentLimitReached {
        /// Total at the time of crossing.
        total: Cents,
    },

    // =========================================================================
    // VIOLATIONS
    // =========================================================================
    /// The backend rejected coupons or lines.
    ViolationDetected(Vec<ViolationNotification>),

    // =========================================================================
    // LIFECYCLE
    // =========================================================================
    /// The cart was emptied.
    CartCleared,

    /// The whole cart was replaced (restore, load).
    CartDataChanged,
}

impl CartEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::ItemAdded { .. }
            | Self::ItemRemoved { .. }
            | Self::QuantityChanged { .. }
            | Self::ProductsUpdated => EventTopic::Items,
            Self::PricesUpdated | Self::TaxationChanged(_) => EventTopic::Prices,
            Self::CheckoutLimitReached { .. } | Self::OnlinePaymentLimitReached { .. } => {
                EventTopic::Limits
            }
            Self::ViolationDetected(_) => EventTopic::Violations,
            Self::CartCleared | Self::CartDataChanged => EventTopic::Lifecycle,
        }
    }

    /// Short name used in logs and metrics labels.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ItemAdded { .. } => "item_added",
            Self::ItemRemoved { .. } => "item_removed",
            Self::QuantityChanged { .. } => "quantity_changed",
            Self::ProductsUpdated => "products_updated",
            Self::PricesUpdated => "prices_updated",
            Self::TaxationChanged(_) => "taxation_changed",
            Self::CheckoutLimitReached { .. } => "checkout_limit_reached",
            Self::OnlinePaymentLimitReached { .. } => "online_payment_limit_reached",
            Self::ViolationDetected(_) => "violation_detected",
            Self::CartCleared => "cart_cleared",
            Self::CartDataChanged => "cart_data_changed",
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Item insertions, removals and quantity changes.
    Items,
    /// Price and taxation changes.
    Prices,
    /// Spending limit crossings.
    Limits,
    /// Backend violations.
    Violations,
    /// Clear and wholesale replacement.
    Lifecycle,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &CartEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
