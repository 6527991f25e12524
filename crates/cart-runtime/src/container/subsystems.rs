//! # Cart Container
//!
//! Owns one instance of every cart subsystem and wires them together:
//!
//! ```text
//! ShoppingCart ──events──→ InMemoryEventBus ──→ CartPersistence (debounced save)
//!      │
//!      └──UpdateScheduler──→ CartUpdater ──→ CheckoutApi / ProductLookup
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use sg_01_shopping_cart::{
    CartUpdater, CheckoutApi, ProductLookup, ShoppingCart, SystemTimeSource, TimeSource,
    UpdateMode,
};
use sg_02_cart_storage::{CartPersistence, CartStore, LoadOutcome};
use shared_bus::InMemoryEventBus;
use tokio::task::JoinHandle;
use tracing::info;

use super::config::RuntimeConfig;

/// Outbound collaborators supplied by the host application.
pub struct Collaborators {
    /// Checkout backend.
    pub checkout_api: Arc<dyn CheckoutApi>,
    /// Online product catalog.
    pub product_lookup: Arc<dyn ProductLookup>,
    /// Durable cart storage.
    pub store: Arc<dyn CartStore>,
    /// Clock; the system clock when `None`.
    pub clock: Option<Arc<dyn TimeSource>>,
}

/// All cart subsystems, wired.
pub struct CartContainer {
    /// Configuration the container was built from.
    pub config: RuntimeConfig,
    /// Cart event bus.
    pub bus: Arc<InMemoryEventBus>,
    /// Cart engine.
    pub cart: ShoppingCart,
    /// Reconciliation coordinator.
    pub updater: CartUpdater,
    /// Persistence, present while checked into a shop.
    pub persistence: Option<CartPersistence>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl CartContainer {
    /// Build all subsystems. Nothing runs until [`CartContainer::start`].
    pub fn new(config: RuntimeConfig, collaborators: Collaborators) -> Self {
        let bus = Arc::new(InMemoryEventBus::with_capacity(
            config.effective_bus_capacity(),
        ));
        let clock = collaborators
            .clock
            .unwrap_or_else(|| Arc::new(SystemTimeSource));

        let cart = ShoppingCart::new(
            config.cart.clone(),
            config.shop_id.clone(),
            bus.clone(),
            clock.clone(),
        );
        let updater = CartUpdater::new(
            cart.clone(),
            collaborators.checkout_api,
            collaborators.product_lookup,
        );
        let persistence = config.shop_id.as_ref().map(|shop_id| {
            CartPersistence::new(
                cart.clone(),
                collaborators.store,
                clock,
                config.storage.clone(),
                shop_id.clone(),
            )
        });

        Self {
            config,
            bus,
            cart,
            updater,
            persistence,
            listener: Mutex::new(None),
        }
    }

    /// Load the saved cart, start saving on changes and route cart
    /// mutations to the coordinator.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn start(&self) -> Result<Option<LoadOutcome>> {
        let outcome = match &self.persistence {
            Some(persistence) => {
                let outcome = persistence.load().await;
                *self.listener.lock() = Some(persistence.spawn_listener(&self.bus));
                Some(outcome)
            }
            None => None,
        };

        self.updater.attach();
        if !self.cart.is_empty() {
            self.updater.request(UpdateMode::Immediate);
        }

        info!(
            shop_id = ?self.config.shop_id,
            items = self.cart.len(),
            outcome = ?outcome,
            "Cart runtime started"
        );
        Ok(outcome)
    }

    /// Stop background work and flush the cart to storage.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Initiating cart runtime shutdown...");
        self.updater.cancel_pending();
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
        if let Some(persistence) = &self.persistence {
            persistence.cancel_pending_save();
            persistence
                .save_now()
                .await
                .context("Failed to flush cart on shutdown")?;
        }
        info!("Shutdown complete");
        Ok(())
    }
}
