//! # Cart Persistence Service
//!
//! Writes the cart to its `CartStore` a short while after the last cart
//! event, and loads it back at startup or when the shopper switches shops.
//! Storage problems never take the cart down: they are logged and the cart
//! continues in memory.

use std::sync::Arc;

use parking_lot::Mutex;
use scango_telemetry::{metric_inc, STORAGE_LOADS, STORAGE_WRITES};
use sg_01_shopping_cart::{CartState, Debouncer, ShoppingCart, TimeSource};
use shared_bus::{EventFilter, InMemoryEventBus};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::domain::{FreshReason, LoadOutcome, StorageError, StorageKey};
use crate::ports::CartStore;

struct PersistenceShared {
    cart: ShoppingCart,
    store: Arc<dyn CartStore>,
    clock: Arc<dyn TimeSource>,
    config: StorageConfig,
    active: Mutex<StorageKey>,
    debouncer: Debouncer,
}

/// Persists one cart. Cheap to clone.
#[derive(Clone)]
pub struct CartPersistence {
    shared: Arc<PersistenceShared>,
}

impl CartPersistence {
    /// Persist `cart` for `shop_id` in the configured environment.
    pub fn new(
        cart: ShoppingCart,
        store: Arc<dyn CartStore>,
        clock: Arc<dyn TimeSource>,
        config: StorageConfig,
        shop_id: impl Into<String>,
    ) -> Self {
        let active = StorageKey::new(config.environment, shop_id);
        let debouncer = Debouncer::new(config.save_debounce());
        Self {
            shared: Arc::new(PersistenceShared {
                cart,
                store,
                clock,
                config,
                active: Mutex::new(active),
                debouncer,
            }),
        }
    }

    /// Key the cart is currently saved under.
    pub fn active_key(&self) -> StorageKey {
        self.shared.active.lock().clone()
    }

    /// Restart the save timer.
    pub fn schedule_save(&self) -> bool {
        let persistence = self.clone();
        self.shared.debouncer.schedule(move || async move {
            // Failures are logged and counted inside save_now.
            let _ = persistence.save_now().await;
        })
    }

    /// Whether a save is waiting.
    pub fn is_save_pending(&self) -> bool {
        self.shared.debouncer.is_pending()
    }

    /// Drop a waiting save. Returns whether one was pending.
    pub fn cancel_pending_save(&self) -> bool {
        self.shared.debouncer.cancel()
    }

    /// Write the cart now under the active key.
    pub async fn save_now(&self) -> Result<(), StorageError> {
        let key = self.active_key();
        self.save_to(key).await
    }

    async fn save_to(&self, key: StorageKey) -> Result<(), StorageError> {
        let state = self.shared.cart.snapshot();
        let bytes = match serde_json::to_vec(&state) {
            Ok(bytes) => bytes,
            Err(e) => {
                metric_inc!(STORAGE_WRITES, &["error"]);
                warn!(key = %key, error = %e, "[sg-02] Failed to encode cart");
                return Err(e.into());
            }
        };

        let store = self.shared.store.clone();
        let write_key = key.clone();
        let result = tokio::task::spawn_blocking(move || store.write(&write_key, &bytes))
            .await
            .map_err(|e| StorageError::Task {
                message: e.to_string(),
            })
            .and_then(|written| written);

        match &result {
            Ok(()) => {
                metric_inc!(STORAGE_WRITES, &["ok"]);
                debug!(key = %key, items = state.len(), "[sg-02] Cart saved");
            }
            Err(e) => {
                metric_inc!(STORAGE_WRITES, &["error"]);
                warn!(key = %key, error = %e, "[sg-02] Failed to save cart");
            }
        }
        result
    }

    /// Load the cart stored under the active key into the live cart.
    ///
    /// Anything but a readable, decodable, recent cart yields an empty cart
    /// for the active shop.
    pub async fn load(&self) -> LoadOutcome {
        let key = self.active_key();
        let store = self.shared.store.clone();
        let read_key = key.clone();
        let read = tokio::task::spawn_blocking(move || store.read(&read_key))
            .await
            .map_err(|e| StorageError::Task {
                message: e.to_string(),
            })
            .and_then(|bytes| bytes);

        let now = self.shared.clock.now();
        let fresh = || CartState::new(Some(key.shop_id.clone()), now);
        let max_age = self.shared.config.max_cart_age_ms;

        let (state, outcome) = match read {
            Err(e) => {
                warn!(key = %key, error = %e, "[sg-02] Failed to read cart, starting empty");
                (fresh(), LoadOutcome::Fresh(FreshReason::ReadFailed))
            }
            Ok(None) => (fresh(), LoadOutcome::Fresh(FreshReason::Missing)),
            Ok(Some(bytes)) => match serde_json::from_slice::<CartState>(&bytes) {
                Err(e) => {
                    warn!(key = %key, error = %e, "[sg-02] Stored cart is malformed, starting empty");
                    (fresh(), LoadOutcome::Fresh(FreshReason::Malformed))
                }
                Ok(stored) if now.saturating_sub(stored.last_modified) > max_age => {
                    info!(
                        key = %key,
                        age_ms = now.saturating_sub(stored.last_modified),
                        "[sg-02] Stored cart expired, starting a new session"
                    );
                    (fresh(), LoadOutcome::Expired)
                }
                Ok(mut stored) => {
                    stored.shop_id = Some(key.shop_id.clone());
                    let items = stored.len();
                    (stored, LoadOutcome::Resumed { items })
                }
            },
        };

        self.shared.cart.replace_state(state);
        metric_inc!(STORAGE_LOADS, &[outcome.label()]);
        info!(key = %key, outcome = outcome.label(), "[sg-02] Cart loaded");
        outcome
    }

    /// Save the current cart, then switch to the cart of `shop_id`.
    pub async fn switch_shop(&self, shop_id: impl Into<String>) -> LoadOutcome {
        self.shared.debouncer.cancel();
        let previous = self.active_key();
        if let Err(e) = self.save_to(previous.clone()).await {
            warn!(key = %previous, error = %e, "[sg-02] Could not flush cart before switching shop");
        }

        let next = StorageKey::new(self.shared.config.environment, shop_id);
        info!(from = %previous, to = %next, "[sg-02] Switching shop");
        *self.shared.active.lock() = next;
        self.load().await
    }

    /// Save after every burst of cart events published on `bus`.
    ///
    /// The task runs until the bus closes or the handle is aborted.
    pub fn spawn_listener(&self, bus: &InMemoryEventBus) -> JoinHandle<()> {
        let mut subscription = bus.subscribe(EventFilter::all());
        let persistence = self.clone();
        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                debug!(event = event.name(), "[sg-02] Cart event, scheduling save");
                persistence.schedule_save();
            }
            persistence.shared.debouncer.cancel();
        })
    }
}
