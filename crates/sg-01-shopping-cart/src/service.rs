//! # Shopping Cart Service
//!
//! The cart engine: every mutation runs in one short critical section over
//! the `CartState`, then publishes the collected events and forwards a
//! reconciliation request to the attached scheduler. The lock is never
//! held across an `.await` or while publishing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use scango_telemetry::{metric_inc, CART_ITEMS, CART_MUTATIONS};
use shared_bus::{CartEvent, EventPublisher};
use shared_types::{
    Cents, CheckoutInfo, Coupon, LineItem, Product, Taxation, Violation, ViolationNotification,
};
use tracing::{debug, info};

use crate::config::CartConfig;
use crate::domain::{
    apply_checkout_info, substituted_skus, ApplySummary, BackendCart, BackendIdentity, CartError,
    CartItem, CartState, CheckoutFailure, Insertion, LimitCrossing, PriceContext, ReconcileError,
    ViolationResolution,
};
use crate::ports::{NoopScheduler, TimeSource, UpdateMode, UpdateScheduler};

/// What a mutation produced, dispatched after the lock is released.
#[derive(Default)]
struct Effects {
    events: Vec<CartEvent>,
    update: Option<UpdateMode>,
    item_count: usize,
}

impl Effects {
    fn emit(&mut self, event: CartEvent) {
        self.events.push(event);
    }

    /// An immediate request wins over a debounced one.
    fn request(&mut self, mode: UpdateMode) {
        self.update = match (self.update, mode) {
            (Some(UpdateMode::Immediate), _) | (_, UpdateMode::Immediate) => {
                Some(UpdateMode::Immediate)
            }
            _ => Some(UpdateMode::Debounced),
        };
    }

    fn limits(&mut self, crossings: Vec<LimitCrossing>) {
        for crossing in crossings {
            self.emit(match crossing {
                LimitCrossing::Checkout(total) => CartEvent::CheckoutLimitReached { total },
                LimitCrossing::OnlinePayment(total) => {
                    CartEvent::OnlinePaymentLimitReached { total }
                }
            });
        }
    }

    fn violations(&mut self, resolution: ViolationResolution) -> bool {
        let removed = !resolution.removed.is_empty();
        for (index, item) in resolution.removed {
            self.emit(CartEvent::ItemRemoved {
                index,
                item_id: item.id,
            });
        }
        if !resolution.new_notifications.is_empty() {
            self.emit(CartEvent::ViolationDetected(resolution.new_notifications));
        }
        removed
    }
}

/// Consistent view handed to the reconciliation coordinator.
#[derive(Debug, Clone)]
pub struct CheckoutSnapshot {
    /// Modification count at snapshot time; the request token.
    pub token: u64,
    /// Number of items.
    pub item_count: usize,
    /// The backend cart, `None` without a shop.
    pub cart: Option<BackendCart>,
}

/// Result of committing a backend answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// The cart changed since the request was sent; nothing was touched.
    Stale {
        /// Current modification count.
        current: u64,
    },
    /// The answer was folded into the cart.
    Applied {
        /// Committed online total.
        total: Cents,
    },
    /// The answer was current but could not be applied.
    Failed(ReconcileError),
}

struct CartInner {
    state: Mutex<CartState>,
    config: CartConfig,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
    scheduler: RwLock<Arc<dyn UpdateScheduler>>,
}

/// The shopping cart engine. Cheap to clone; clones share one cart.
#[derive(Clone)]
pub struct ShoppingCart {
    inner: Arc<CartInner>,
}

impl ShoppingCart {
    /// Create an empty cart for `shop_id`.
    pub fn new(
        config: CartConfig,
        shop_id: Option<String>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let state = CartState::new(shop_id, clock.now());
        Self::with_state(config, state, publisher, clock)
    }

    /// Create a cart around an existing state.
    pub fn with_state(
        config: CartConfig,
        state: CartState,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            inner: Arc::new(CartInner {
                state: Mutex::new(state),
                config,
                publisher,
                clock,
                scheduler: RwLock::new(Arc::new(NoopScheduler)),
            }),
        }
    }

    /// Route reconciliation requests to `scheduler`.
    pub fn set_scheduler(&self, scheduler: Arc<dyn UpdateScheduler>) {
        *self.inner.scheduler.write() = scheduler;
    }

    /// The cart's configuration.
    pub fn config(&self) -> &CartConfig {
        &self.inner.config
    }

    fn ctx(&self) -> PriceContext {
        self.inner.config.price_context()
    }

    fn now(&self) -> u64 {
        self.inner.clock.now()
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut CartState, &mut Effects) -> R) -> R {
        let mut effects = Effects::default();
        let result = {
            let mut state = self.inner.state.lock();
            let result = f(&mut state, &mut effects);
            effects.item_count = state.len();
            result
        };
        self.dispatch(effects);
        result
    }

    fn dispatch(&self, effects: Effects) {
        CART_ITEMS.set(effects.item_count as f64);
        for event in effects.events {
            self.inner.publisher.publish(event);
        }
        if let Some(mode) = effects.update {
            let scheduler = self.inner.scheduler.read().clone();
            scheduler.request_update(mode);
        }
    }

    fn check_limits_locked(&self, state: &mut CartState, effects: &mut Effects) {
        let config = &self.inner.config;
        let crossings = state.update_limits(
            config.max_checkout_limit,
            config.max_online_payment_limit,
            self.ctx(),
        );
        effects.limits(crossings);
    }

    /// Priced change bookkeeping shared by all content mutations.
    fn priced_change(&self, state: &mut CartState, effects: &mut Effects, mode: UpdateMode) {
        state.touch(self.now());
        state.invalidate_online_prices();
        self.check_limits_locked(state, effects);
        effects.request(mode);
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Merge `item` into an equal mergeable item or insert it at `index`.
    ///
    /// Returns the item's resulting position.
    pub fn insert(&self, item: CartItem, index: usize) -> usize {
        let ctx = self.ctx();
        self.mutate(|state, effects| {
            let item_id = item.id.clone();
            let insertion = state.insert(item, index, ctx);
            let position = match insertion {
                Insertion::Saturated(position) => {
                    debug!(position, "[sg-01] Merge target at quantity cap, nothing changed");
                    return position;
                }
                Insertion::Merged(position) => {
                    metric_inc!(CART_MUTATIONS, &["merge"]);
                    effects.emit(CartEvent::QuantityChanged {
                        index: position,
                        item_id: state.items[position].id.clone(),
                    });
                    position
                }
                Insertion::Inserted(position) => {
                    metric_inc!(CART_MUTATIONS, &["insert"]);
                    effects.emit(CartEvent::ItemAdded {
                        index: position,
                        item_id,
                    });
                    position
                }
            };
            state.backup = None;
            self.priced_change(state, effects, UpdateMode::Debounced);
            debug!(
                position,
                items = state.len(),
                modification_count = state.modification_count,
                "[sg-01] Item inserted"
            );
            position
        })
    }

    /// Insert `item` at the top of the cart.
    pub fn add(&self, item: CartItem) -> usize {
        self.insert(item, 0)
    }

    /// Remove the item at `index` and reconcile right away.
    pub fn remove(&self, index: usize) -> Result<CartItem, CartError> {
        self.mutate(|state, effects| {
            let removed = state.remove(index)?;
            metric_inc!(CART_MUTATIONS, &["remove"]);
            effects.emit(CartEvent::ItemRemoved {
                index,
                item_id: removed.id.clone(),
            });
            self.priced_change(state, effects, UpdateMode::Immediate);
            debug!(index, items = state.len(), "[sg-01] Item removed");
            Ok(removed)
        })
    }

    /// Set the unit counter of the product at `index`. Zero removes it.
    pub fn set_quantity(&self, index: usize, quantity: i64) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(index).map(|_| ());
        }
        self.mutate(|state, effects| {
            let item = state.item_mut(index)?;
            item.set_quantity(quantity)?;
            let item_id = item.id.clone();
            metric_inc!(CART_MUTATIONS, &["quantity"]);
            effects.emit(CartEvent::QuantityChanged { index, item_id });
            self.priced_change(state, effects, UpdateMode::Debounced);
            Ok(())
        })
    }

    /// Attach or detach a manual coupon on the product at `index`.
    pub fn set_manual_coupon(&self, index: usize, coupon: Option<Coupon>) -> Result<(), CartError> {
        self.mutate(|state, effects| {
            let item = state.item_mut(index)?;
            item.set_manual_coupon(coupon)?;
            let item_id = item.id.clone();
            metric_inc!(CART_MUTATIONS, &["coupon"]);
            effects.emit(CartEvent::QuantityChanged { index, item_id });
            self.priced_change(state, effects, UpdateMode::Debounced);
            Ok(())
        })
    }

    /// Keep a copy of the cart for [`ShoppingCart::restore`]. Empty carts
    /// are not backed up.
    pub fn backup(&self) -> bool {
        let now = self.now();
        self.inner.state.lock().take_backup(now)
    }

    /// Whether a backup exists and has not expired.
    pub fn is_restorable(&self) -> bool {
        let now = self.now();
        self.inner
            .state
            .lock()
            .is_restorable(now, self.inner.config.backup_ttl_ms)
    }

    /// Drop the backup.
    pub fn clear_backup(&self) {
        self.inner.state.lock().backup = None;
    }

    /// Bring back the backed up cart. No-op once the backup expired.
    pub fn restore(&self) -> bool {
        let now = self.now();
        let ttl = self.inner.config.backup_ttl_ms;
        self.mutate(|state, effects| {
            if !state.is_restorable(now, ttl) {
                return false;
            }
            let Some(backup) = state.backup.take() else {
                return false;
            };
            let mut restored = backup.state;
            restored.last_modified = now;
            state.replace_with(restored);
            state.invalidate_online_prices();
            metric_inc!(CART_MUTATIONS, &["restore"]);
            self.check_limits_locked(state, effects);
            effects.emit(CartEvent::CartDataChanged);
            effects.request(UpdateMode::Immediate);
            info!(items = state.len(), "[sg-01] Cart restored from backup");
            true
        })
    }

    /// Drop all backend-derived prices and lines.
    pub fn invalidate_online_prices(&self) {
        self.mutate(|state, effects| {
            state.invalidate_online_prices();
            effects.emit(CartEvent::PricesUpdated);
        });
    }

    /// Re-evaluate spending limits, notifying on upward crossings.
    pub fn check_limits(&self) {
        self.mutate(|state, effects| self.check_limits_locked(state, effects));
    }

    /// Remove coupons the backend rejected and record violation notices.
    pub fn resolve_violations(&self, violations: &[Violation]) {
        let now = self.now();
        self.mutate(|state, effects| {
            let resolution = state.resolve_violations(violations, now);
            if effects.violations(resolution) {
                metric_inc!(CART_MUTATIONS, &["violation"]);
                state.invalidate_online_prices();
                self.check_limits_locked(state, effects);
                effects.request(UpdateMode::Immediate);
            }
        });
    }

    /// Acknowledge violation notices.
    pub fn remove_violation_notifications(&self, refers_to: &[String]) -> usize {
        self.inner
            .state
            .lock()
            .remove_violation_notifications(refers_to)
    }

    /// Remove all items.
    pub fn clear(&self) {
        let now = self.now();
        self.mutate(|state, effects| {
            state.clear(now);
            metric_inc!(CART_MUTATIONS, &["clear"]);
            self.check_limits_locked(state, effects);
            effects.emit(CartEvent::CartCleared);
            effects.request(UpdateMode::Immediate);
            info!(modification_count = state.modification_count, "[sg-01] Cart cleared");
        });
    }

    /// Clear the cart and start a new session.
    pub fn invalidate(&self) {
        let now = self.now();
        self.mutate(|state, effects| {
            state.clear(now);
            state.session_id = uuid::Uuid::new_v4().to_string();
            state.taxation = Taxation::Unspecified;
            metric_inc!(CART_MUTATIONS, &["clear"]);
            self.check_limits_locked(state, effects);
            effects.emit(CartEvent::CartCleared);
            effects.request(UpdateMode::Immediate);
            info!(session_id = %state.session_id, "[sg-01] Cart invalidated");
        });
    }

    /// Change the tax treatment.
    pub fn set_taxation(&self, taxation: Taxation) {
        self.mutate(|state, effects| {
            if state.taxation == taxation {
                return;
            }
            state.taxation = taxation;
            effects.emit(CartEvent::TaxationChanged(taxation));
            // The backend prices taxation, so answers sent before this are stale.
            self.priced_change(state, effects, UpdateMode::Immediate);
        });
    }

    /// Replace the whole state, e.g. with one loaded from storage.
    ///
    /// Counters stay monotonic. Limits already latched in `next` are not
    /// reported again.
    pub fn replace_state(&self, next: CartState) {
        self.mutate(|state, effects| {
            state.replace_with(next);
            self.check_limits_locked(state, effects);
            effects.emit(CartEvent::CartDataChanged);
        });
    }

    // =========================================================================
    // RECONCILIATION SUPPORT
    // =========================================================================

    fn identity(&self) -> BackendIdentity {
        let config = &self.inner.config;
        BackendIdentity {
            client_id: config.client_id.clone(),
            app_user_id: config.app_user_id.clone(),
            customer_card: config.customer_card_id.clone(),
        }
    }

    /// The cart as the checkout backend prices it. `None` without a shop.
    pub fn to_backend_cart(&self) -> Option<BackendCart> {
        let identity = self.identity();
        BackendCart::from_state(&self.inner.state.lock(), &identity)
    }

    /// Consistent snapshot for a backend request.
    pub fn checkout_snapshot(&self) -> CheckoutSnapshot {
        let identity = self.identity();
        let state = self.inner.state.lock();
        CheckoutSnapshot {
            token: state.modification_count,
            item_count: state.len(),
            cart: BackendCart::from_state(&state, &identity),
        }
    }

    /// SKUs in `line_items` that differ from the local products they price.
    pub fn substituted_skus(&self, line_items: &[LineItem]) -> Vec<String> {
        substituted_skus(&self.inner.state.lock(), line_items)
    }

    /// Fold a backend answer for request `token` into the cart.
    pub fn commit_checkout_info(
        &self,
        token: u64,
        checkout_info: &CheckoutInfo,
        substitutions: &HashMap<String, Product>,
    ) -> Commit {
        let now = self.now();
        let display_net_price = self.inner.config.display_net_price;
        self.mutate(|state, effects| {
            if state.modification_count != token {
                return Commit::Stale {
                    current: state.modification_count,
                };
            }
            let summary: ApplySummary = match apply_checkout_info(
                state,
                checkout_info,
                substitutions,
                display_net_price,
                now,
            ) {
                Ok(summary) => summary,
                Err(err) => return Commit::Failed(err),
            };

            let total = summary.total;
            if effects.violations(summary.violations) {
                effects.request(UpdateMode::Immediate);
            }
            self.check_limits_locked(state, effects);
            if summary.products_updated {
                effects.emit(CartEvent::ProductsUpdated);
            }
            effects.emit(CartEvent::PricesUpdated);
            Commit::Applied { total }
        })
    }

    /// Record a backend rejection for request `token`. Returns `false` when
    /// the cart changed since the request was sent.
    pub fn record_checkout_failure(&self, token: u64, failure: &CheckoutFailure) -> bool {
        self.mutate(|state, effects| {
            if state.modification_count != token {
                return false;
            }
            match failure {
                CheckoutFailure::InvalidProducts(products) => {
                    state.invalid_products = Some(products.clone());
                    effects.emit(CartEvent::PricesUpdated);
                }
                CheckoutFailure::InvalidDepositReturnVoucher => {
                    state.invalid_deposit_return_voucher = true;
                    effects.emit(CartEvent::PricesUpdated);
                }
                _ => {}
            }
            true
        })
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Number of items.
    pub fn len(&self) -> usize {
        self.inner.state.lock().len()
    }

    /// Whether the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().is_empty()
    }

    /// Copy of the item at `index`.
    pub fn get(&self, index: usize) -> Option<CartItem> {
        self.inner.state.lock().items.get(index).cloned()
    }

    /// Copy of all items.
    pub fn items(&self) -> Vec<CartItem> {
        self.inner.state.lock().items.clone()
    }

    /// Copy of the item with `id`.
    pub fn item_by_id(&self, id: &str) -> Option<CartItem> {
        self.inner
            .state
            .lock()
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    /// Structural copy of the whole state.
    pub fn snapshot(&self) -> CartState {
        self.inner.state.lock().clone()
    }

    /// The optimistic concurrency token.
    pub fn modification_count(&self) -> u64 {
        self.inner.state.lock().modification_count
    }

    /// Insertions over the cart's lifetime.
    pub fn addition_count(&self) -> u64 {
        self.inner.state.lock().addition_count
    }

    /// Current session.
    pub fn session_id(&self) -> String {
        self.inner.state.lock().session_id.clone()
    }

    /// Identifier of the current content version.
    pub fn checkout_token(&self) -> String {
        self.inner.state.lock().checkout_token.clone()
    }

    /// Shop the cart belongs to.
    pub fn shop_id(&self) -> Option<String> {
        self.inner.state.lock().shop_id.clone()
    }

    /// Authoritative backend total, if reconciled.
    pub fn online_total_price(&self) -> Option<Cents> {
        self.inner.state.lock().online_total_price
    }

    /// Cart total.
    pub fn total_price(&self) -> Cents {
        self.inner.state.lock().total_price(self.ctx())
    }

    /// Deposit total.
    pub fn total_deposit_price(&self) -> Cents {
        self.inner.state.lock().total_deposit_price(self.ctx())
    }

    /// Article count for display.
    pub fn total_quantity(&self) -> i64 {
        self.inner.state.lock().total_quantity()
    }

    /// Current tax treatment.
    pub fn taxation(&self) -> Taxation {
        self.inner.state.lock().taxation
    }

    /// Unacknowledged violation notices.
    pub fn violation_notifications(&self) -> Vec<ViolationNotification> {
        self.inner.state.lock().violation_notifications.clone()
    }

    /// Products the backend refused to sell.
    pub fn invalid_products(&self) -> Option<Vec<Product>> {
        self.inner.state.lock().invalid_products.clone()
    }

    /// Whether the backend refused the deposit return voucher.
    pub fn has_invalid_deposit_return_voucher(&self) -> bool {
        self.inner.state.lock().invalid_deposit_return_voucher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockTimeSource, RecordingScheduler};
    use crate::domain::MAX_QUANTITY;
    use shared_bus::{EventFilter, InMemoryEventBus, Subscription};
    use shared_types::{CouponType, LineItemType, Price, ScannedCode, ViolationType};

    struct Harness {
        cart: ShoppingCart,
        events: Subscription,
        scheduler: Arc<RecordingScheduler>,
        clock: Arc<MockTimeSource>,
    }

    impl Harness {
        fn new(config: CartConfig) -> Self {
            let bus = Arc::new(InMemoryEventBus::new());
            let events = bus.subscribe(EventFilter::all());
            let clock = Arc::new(MockTimeSource::new(1_000));
            let scheduler = Arc::new(RecordingScheduler::default());
            let cart = ShoppingCart::new(config, Some("shop-1".into()), bus, clock.clone());
            cart.set_scheduler(scheduler.clone());
            Self {
                cart,
                events,
                scheduler,
                clock,
            }
        }

        fn drain(&mut self) -> Vec<CartEvent> {
            let mut events = Vec::new();
            while let Ok(Some(event)) = self.events.try_recv() {
                events.push(event);
            }
            events
        }
    }

    fn article(sku: &str, price: Cents) -> CartItem {
        CartItem::product(
            Product::article(sku, sku.to_uppercase(), price),
            ScannedCode::plain(format!("code-{sku}")),
        )
    }

    #[test]
    fn test_add_same_product_twice_merges() {
        let mut h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        h.cart.add(article("a", 100));

        assert_eq!(h.cart.len(), 1);
        assert_eq!(h.cart.get(0).map(|i| i.quantity()), Some(2));
        assert_eq!(h.cart.modification_count(), 2);

        let events = h.drain();
        assert!(matches!(events[0], CartEvent::ItemAdded { index: 0, .. }));
        assert!(matches!(events[1], CartEvent::QuantityChanged { index: 0, .. }));
        assert_eq!(events.len(), 2);
        assert_eq!(
            h.scheduler.requests(),
            vec![UpdateMode::Debounced, UpdateMode::Debounced]
        );
    }

    #[test]
    fn test_remove_requests_immediate_update() {
        let mut h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        let token = h.cart.checkout_token();
        let removed = h.cart.remove(0).expect("remove");

        assert!(h.cart.is_empty());
        assert_eq!(removed.sku(), Some("a"));
        assert_ne!(h.cart.checkout_token(), token);
        assert_eq!(h.scheduler.last(), Some(UpdateMode::Immediate));
        assert!(h
            .drain()
            .iter()
            .any(|e| matches!(e, CartEvent::ItemRemoved { index: 0, .. })));
    }

    #[test]
    fn test_remove_out_of_bounds_changes_nothing() {
        let h = Harness::new(CartConfig::default());
        assert_eq!(
            h.cart.remove(3),
            Err(CartError::IndexOutOfBounds { index: 3, len: 0 })
        );
        assert_eq!(h.cart.modification_count(), 0);
        assert!(h.scheduler.requests().is_empty());
    }

    #[test]
    fn test_insert_invalidates_online_prices_and_backup() {
        let h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        let snapshot = h.cart.checkout_snapshot();
        let id = h.cart.get(0).map(|i| i.id).expect("item");
        let info = CheckoutInfo {
            line_items: vec![LineItem::new(id, LineItemType::Default, 90)],
            price: Price {
                price: 90,
                net_price: 76,
            },
            ..CheckoutInfo::default()
        };
        assert_eq!(
            h.cart.commit_checkout_info(snapshot.token, &info, &HashMap::new()),
            Commit::Applied { total: 90 }
        );
        assert!(h.cart.backup());

        h.cart.add(article("b", 50));
        assert_eq!(h.cart.online_total_price(), None);
        assert!(!h.cart.is_restorable());
        assert_eq!(h.cart.total_price(), 150);
    }

    #[test]
    fn test_set_quantity_and_zero_removes() {
        let mut h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        h.cart.set_quantity(0, 3).expect("quantity");
        assert_eq!(h.cart.total_price(), 300);
        assert_eq!(
            h.cart.set_quantity(0, -1),
            Err(CartError::InvalidQuantity(-1))
        );

        h.cart.set_quantity(0, 0).expect("remove");
        assert!(h.cart.is_empty());
        let events = h.drain();
        assert!(events
            .iter()
            .any(|e| matches!(e, CartEvent::QuantityChanged { .. })));
        assert!(matches!(events.last(), Some(CartEvent::ItemRemoved { .. })));
    }

    #[test]
    fn test_manual_coupon_is_priced_change() {
        let h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        let before = h.cart.modification_count();
        let coupon = Coupon {
            id: "mc".into(),
            name: "Manual".into(),
            coupon_type: CouponType::Manual,
            code: None,
        };
        h.cart.set_manual_coupon(0, Some(coupon)).expect("coupon");
        assert_eq!(h.cart.modification_count(), before + 1);

        let printed = Coupon {
            id: "pc".into(),
            name: "Printed".into(),
            coupon_type: CouponType::Printed,
            code: None,
        };
        assert_eq!(
            h.cart.set_manual_coupon(0, Some(printed)),
            Err(CartError::NotAManualCoupon("pc".into()))
        );
        assert_eq!(h.cart.modification_count(), before + 1);
    }

    #[test]
    fn test_restore_within_ttl() {
        let mut h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        h.cart.add(article("b", 200));
        h.cart.add(article("c", 300));
        let items = h.cart.items();
        assert!(h.cart.backup());
        h.cart.remove(0).expect("remove");
        let count = h.cart.modification_count();
        h.drain();

        h.clock.advance(60_000);
        assert!(h.cart.restore());
        assert_eq!(h.cart.items(), items);
        assert!(h.cart.modification_count() > count);
        assert!(!h.cart.is_restorable());
        assert!(h.drain().contains(&CartEvent::CartDataChanged));
        assert_eq!(h.scheduler.last(), Some(UpdateMode::Immediate));
    }

    #[test]
    fn test_clear_drops_backup() {
        let h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        assert!(h.cart.backup());
        h.cart.clear();
        assert!(!h.cart.restore());
        assert!(h.cart.is_empty());
    }

    #[test]
    fn test_restore_after_ttl_is_noop() {
        let h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        h.cart.backup();
        h.cart.remove(0).expect("remove");

        h.clock.advance(300_000);
        assert!(!h.cart.restore());
        assert!(h.cart.is_empty());
    }

    #[test]
    fn test_limit_notifications_fire_once_per_crossing() {
        let mut h = Harness::new(CartConfig::for_testing());
        h.cart.add(article("a", 6_000));
        let events = h.drain();
        assert!(events.contains(&CartEvent::OnlinePaymentLimitReached { total: 6_000 }));

        h.cart.add(article("a", 6_000));
        let events = h.drain();
        assert!(events.contains(&CartEvent::CheckoutLimitReached { total: 12_000 }));
        assert!(!events
            .iter()
            .any(|e| matches!(e, CartEvent::OnlinePaymentLimitReached { .. })));

        h.cart.check_limits();
        assert!(h.drain().is_empty());

        h.cart.remove(0).expect("remove");
        h.drain();
        h.cart.add(article("a", 6_000));
        assert!(h
            .drain()
            .contains(&CartEvent::OnlinePaymentLimitReached { total: 6_000 }));
    }

    #[test]
    fn test_stale_commit_changes_nothing() {
        let h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        let snapshot = h.cart.checkout_snapshot();
        h.cart.add(article("b", 100));

        let info = CheckoutInfo {
            price: Price {
                price: 1,
                net_price: 1,
            },
            ..CheckoutInfo::default()
        };
        let commit = h.cart.commit_checkout_info(snapshot.token, &info, &HashMap::new());
        assert_eq!(commit, Commit::Stale { current: 2 });
        assert_eq!(h.cart.online_total_price(), None);
        assert_eq!(h.cart.len(), 2);
    }

    #[test]
    fn test_resolve_violations_publishes_and_reconciles() {
        let mut h = Harness::new(CartConfig::default());
        h.cart.add(CartItem::coupon(
            Coupon {
                id: "c1".into(),
                name: "Printed".into(),
                coupon_type: CouponType::Printed,
                code: None,
            },
            None,
        ));
        h.drain();
        let violation = Violation {
            kind: ViolationType::CouponInvalid,
            refers_to: "c1".into(),
            message: "Invalid".into(),
        };
        h.cart.resolve_violations(&[violation.clone()]);
        h.cart.resolve_violations(&[violation]);

        assert!(h.cart.is_empty());
        assert_eq!(h.cart.violation_notifications().len(), 1);
        let events = h.drain();
        assert!(matches!(events[0], CartEvent::ItemRemoved { index: 0, .. }));
        assert!(matches!(&events[1], CartEvent::ViolationDetected(n) if n.len() == 1));
        assert_eq!(events.len(), 2);

        assert_eq!(
            h.cart.remove_violation_notifications(&["c1".to_string()]),
            1
        );
    }

    #[test]
    fn test_invalidate_starts_new_session() {
        let mut h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        h.cart.set_taxation(Taxation::TakeAway);
        let session = h.cart.session_id();
        let count = h.cart.modification_count();

        h.cart.invalidate();
        assert!(h.cart.is_empty());
        assert_ne!(h.cart.session_id(), session);
        assert_eq!(h.cart.modification_count(), count + 1);
        assert_eq!(h.cart.taxation(), Taxation::Unspecified);
        assert!(h.drain().contains(&CartEvent::CartCleared));
    }

    #[test]
    fn test_set_taxation_publishes_once() {
        let mut h = Harness::new(CartConfig::default());
        h.cart.set_taxation(Taxation::InHouse);
        h.cart.set_taxation(Taxation::InHouse);
        assert_eq!(
            h.drain(),
            vec![CartEvent::TaxationChanged(Taxation::InHouse)]
        );
        assert_eq!(h.scheduler.requests(), vec![UpdateMode::Immediate]);
        assert_eq!(h.cart.modification_count(), 1);
    }

    #[test]
    fn test_set_taxation_outdates_backend_prices() {
        let h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        let snapshot = h.cart.checkout_snapshot();
        let id = h.cart.get(0).map(|i| i.id).expect("item");
        let info = CheckoutInfo {
            line_items: vec![LineItem::new(id, LineItemType::Default, 90)],
            price: Price {
                price: 90,
                net_price: 76,
            },
            ..CheckoutInfo::default()
        };
        let token = h.cart.checkout_token();

        h.cart.set_taxation(Taxation::TakeAway);
        assert_eq!(h.cart.modification_count(), snapshot.token + 1);
        assert_ne!(h.cart.checkout_token(), token);
        assert_eq!(
            h.cart.commit_checkout_info(snapshot.token, &info, &HashMap::new()),
            Commit::Stale {
                current: snapshot.token + 1
            }
        );
        assert_eq!(h.cart.online_total_price(), None);
    }

    #[test]
    fn test_set_taxation_drops_online_prices() {
        let h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        let snapshot = h.cart.checkout_snapshot();
        let id = h.cart.get(0).map(|i| i.id).expect("item");
        let info = CheckoutInfo {
            line_items: vec![LineItem::new(id, LineItemType::Default, 90)],
            price: Price {
                price: 90,
                net_price: 76,
            },
            ..CheckoutInfo::default()
        };
        h.cart.commit_checkout_info(snapshot.token, &info, &HashMap::new());
        assert_eq!(h.cart.online_total_price(), Some(90));

        h.cart.set_taxation(Taxation::InHouse);
        assert_eq!(h.cart.online_total_price(), None);
        assert_eq!(h.cart.total_price(), 100);
    }

    #[test]
    fn test_restore_drops_online_prices() {
        let h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        let snapshot = h.cart.checkout_snapshot();
        let id = h.cart.get(0).map(|i| i.id).expect("item");
        let info = CheckoutInfo {
            line_items: vec![LineItem::new(id, LineItemType::Default, 90)],
            price: Price {
                price: 90,
                net_price: 76,
            },
            ..CheckoutInfo::default()
        };
        assert_eq!(
            h.cart.commit_checkout_info(snapshot.token, &info, &HashMap::new()),
            Commit::Applied { total: 90 }
        );
        assert!(h.cart.backup());
        h.cart.remove(0).expect("remove");

        assert!(h.cart.restore());
        assert_eq!(h.cart.len(), 1);
        assert_eq!(h.cart.online_total_price(), None);
        assert_eq!(h.cart.total_price(), 100);
    }

    #[test]
    fn test_scan_into_capped_item_changes_nothing() {
        let mut h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        h.cart.set_quantity(0, MAX_QUANTITY).expect("quantity");
        assert!(h.cart.backup());
        let count = h.cart.modification_count();
        let token = h.cart.checkout_token();
        let requests = h.scheduler.requests().len();
        h.drain();

        assert_eq!(h.cart.add(article("a", 100)), 0);
        assert_eq!(h.cart.get(0).map(|i| i.quantity()), Some(MAX_QUANTITY));
        assert_eq!(h.cart.modification_count(), count);
        assert_eq!(h.cart.checkout_token(), token);
        assert_eq!(h.scheduler.requests().len(), requests);
        assert!(h.cart.is_restorable());
        assert!(h.drain().is_empty());
    }

    #[test]
    fn test_record_failure_sets_flags() {
        let h = Harness::new(CartConfig::default());
        h.cart.add(article("a", 100));
        let token = h.cart.modification_count();
        let products = vec![Product::article("a", "A", 100)];

        assert!(h
            .cart
            .record_checkout_failure(token, &CheckoutFailure::InvalidProducts(products.clone())));
        assert_eq!(h.cart.invalid_products(), Some(products));
        assert!(!h
            .cart
            .record_checkout_failure(token + 1, &CheckoutFailure::InvalidDepositReturnVoucher));
        assert!(!h.cart.has_invalid_deposit_return_voucher());
    }
}
