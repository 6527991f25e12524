//! Mock adapters backing the test suites and the demo runtime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{
    Cents, CheckoutInfo, LineItem, LineItemType, PaymentMethodInfo, Price, Product,
    SignedCheckoutInfo, Timestamp, Violation,
};
use tokio::sync::Semaphore;

use crate::domain::{BackendCart, BackendQuantity, CheckoutFailure, LookupError};
use crate::ports::{
    CheckoutApi, CheckoutInfoResponse, ProductLookup, TimeSource, UpdateMode, UpdateScheduler,
};

// =============================================================================
// MOCK CHECKOUT BACKEND
// =============================================================================

/// Checkout backend that prices carts from a fixed price table.
///
/// Every product line is echoed back with its id, so answers are always in
/// sync with the cart that was sent. Tests can inject violations, extra
/// backend-only lines, SKU rewrites, a failure, or hold calls on a gate.
#[derive(Default)]
pub struct MockCheckoutApi {
    prices: Mutex<HashMap<String, Cents>>,
    sku_rewrites: Mutex<HashMap<String, String>>,
    extra_lines: Mutex<Vec<LineItem>>,
    violations: Mutex<Vec<Violation>>,
    payment_methods: Mutex<Vec<PaymentMethodInfo>>,
    failure: Mutex<Option<CheckoutFailure>>,
    drop_lines: Mutex<bool>,
    requests: Mutex<Vec<BackendCart>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockCheckoutApi {
    /// Create a backend with an empty price table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend whose calls wait for [`MockCheckoutApi::release`].
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    /// Create a backend that rejects every cart with `failure`.
    pub fn failing(failure: CheckoutFailure) -> Self {
        let api = Self::default();
        *api.failure.lock() = Some(failure);
        api
    }

    /// Set the unit price of `sku`.
    pub fn set_price(&self, sku: impl Into<String>, price: Cents) {
        self.prices.lock().insert(sku.into(), price);
    }

    /// Price `from` as `to`, as if the backend substituted the product.
    pub fn rewrite_sku(&self, from: impl Into<String>, to: impl Into<String>) {
        self.sku_rewrites.lock().insert(from.into(), to.into());
    }

    /// Append a backend-only line to every answer.
    pub fn add_line(&self, line: LineItem) {
        self.extra_lines.lock().push(line);
    }

    /// Report `violation` in every answer.
    pub fn add_violation(&self, violation: Violation) {
        self.violations.lock().push(violation);
    }

    /// Offer these payment methods.
    pub fn set_payment_methods(&self, methods: Vec<PaymentMethodInfo>) {
        *self.payment_methods.lock() = methods;
    }

    /// Reject subsequent carts with `failure`, or accept them again.
    pub fn set_failure(&self, failure: Option<CheckoutFailure>) {
        *self.failure.lock() = failure;
    }

    /// Omit product lines from answers, producing a desync.
    pub fn drop_product_lines(&self, drop: bool) {
        *self.drop_lines.lock() = drop;
    }

    /// Let `calls` held calls proceed.
    pub fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    /// Carts received so far.
    pub fn requests(&self) -> Vec<BackendCart> {
        self.requests.lock().clone()
    }

    /// Number of calls received.
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn line_total(unit_price: Cents, quantity: &BackendQuantity) -> (i64, Cents) {
        match quantity {
            BackendQuantity::Amount { value } | BackendQuantity::Units { value } => {
                (*value, unit_price * value)
            }
            BackendQuantity::Weight { value, unit } => {
                (*value, unit_price * value * unit.factor() / 1_000)
            }
            BackendQuantity::Price { value } => (1, *value),
        }
    }

    fn price_cart(&self, cart: &BackendCart) -> CheckoutInfo {
        let prices = self.prices.lock();
        let rewrites = self.sku_rewrites.lock();
        let drop_lines = *self.drop_lines.lock();
        let mut line_items = Vec::new();

        for item in &cart.items {
            if let Some(coupon_id) = &item.coupon_id {
                let mut line = LineItem::new(item.id.clone(), LineItemType::Coupon, 0);
                line.coupon_id = Some(coupon_id.clone());
                line.refers_to = item.refers_to.clone();
                line_items.push(line);
                continue;
            }
            if drop_lines {
                continue;
            }
            let Some(sku) = item.sku.as_deref() else {
                continue;
            };
            let sku = rewrites.get(sku).map(String::as_str).unwrap_or(sku);
            let unit_price = prices.get(sku).copied().unwrap_or_default();
            let (amount, total) = Self::line_total(unit_price, &item.quantity);

            let mut line = LineItem::new(item.id.clone(), LineItemType::Default, total);
            line.sku = Some(sku.to_string());
            line.name = sku.to_string();
            line.amount = amount;
            line.price = unit_price;
            line.scanned_code = item.scanned_code.clone();
            line_items.push(line);
        }
        line_items.extend(self.extra_lines.lock().iter().cloned());

        let price: Cents = line_items.iter().map(|line| line.total_price).sum();
        CheckoutInfo {
            line_items,
            violations: self.violations.lock().clone(),
            price: Price {
                price,
                net_price: price * 100 / 119,
            },
            payment_methods: self.payment_methods.lock().clone(),
        }
    }
}

#[async_trait]
impl CheckoutApi for MockCheckoutApi {
    async fn create_checkout_info(
        &self,
        cart: BackendCart,
    ) -> Result<CheckoutInfoResponse, CheckoutFailure> {
        self.requests.lock().push(cart.clone());

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| CheckoutFailure::ConnectionError(e.to_string()))?;
            permit.forget();
        }

        if let Some(failure) = self.failure.lock().clone() {
            return Err(failure);
        }

        let checkout_info = self.price_cart(&cart);
        Ok(CheckoutInfoResponse::from_signed(SignedCheckoutInfo {
            checkout_info,
            signature: format!("mock-signature-{}", cart.session),
        }))
    }
}

// =============================================================================
// MOCK PRODUCT CATALOG
// =============================================================================

/// Product catalog backed by a map. Lookups can be held on a gate.
#[derive(Default)]
pub struct MockProductLookup {
    products: Mutex<HashMap<String, Product>>,
    lookups: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl MockProductLookup {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog whose lookups wait for [`MockProductLookup::release`].
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    /// Let `lookups` held lookups through.
    pub fn release(&self, lookups: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(lookups);
        }
    }

    /// Add `product` to the catalog.
    pub fn insert(&self, product: Product) {
        self.products.lock().insert(product.sku.clone(), product);
    }

    /// Number of lookups served.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductLookup for MockProductLookup {
    async fn find_by_sku_online(&self, sku: &str) -> Result<Product, LookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| LookupError::Unavailable(e.to_string()))?
                .forget();
        }
        self.products
            .lock()
            .get(sku)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(sku.to_string()))
    }
}

// =============================================================================
// CLOCK AND SCHEDULER
// =============================================================================

/// Mock time source for testing.
pub struct MockTimeSource {
    time: AtomicU64,
}

impl MockTimeSource {
    /// Start the clock at `initial` milliseconds.
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, ms: u64) {
        self.time.fetch_add(ms, Ordering::SeqCst);
    }

    /// Set the clock.
    pub fn set(&self, time: Timestamp) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(Ordering::SeqCst)
    }
}

/// Scheduler that only records what was requested.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    requests: Mutex<Vec<UpdateMode>>,
}

impl RecordingScheduler {
    /// All requests in order.
    pub fn requests(&self) -> Vec<UpdateMode> {
        self.requests.lock().clone()
    }

    /// The most recent request.
    pub fn last(&self) -> Option<UpdateMode> {
        self.requests.lock().last().copied()
    }
}

impl UpdateScheduler for RecordingScheduler {
    fn request_update(&self, mode: UpdateMode) {
        self.requests.lock().push(mode);
    }
}
