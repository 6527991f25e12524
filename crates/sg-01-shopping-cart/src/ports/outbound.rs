//! # Outbound Ports
//!
//! Traits for what the cart depends on: the checkout backend, the online
//! product catalog, a clock, and whoever runs reconciliations.

use crate::domain::{BackendCart, CheckoutFailure, LookupError};
use async_trait::async_trait;
use shared_types::{PaymentMethodInfo, Price, Product, SignedCheckoutInfo, Timestamp};

/// Successful pricing of a backend cart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckoutInfoResponse {
    /// The signed checkout info, presented again at payment.
    pub signed_checkout_info: SignedCheckoutInfo,
    /// Cart total.
    pub online_price: Price,
    /// Payment methods offered for this cart.
    pub available_payment_methods: Vec<PaymentMethodInfo>,
}

impl CheckoutInfoResponse {
    /// Build a response whose price and methods come from the signed info.
    pub fn from_signed(signed_checkout_info: SignedCheckoutInfo) -> Self {
        Self {
            online_price: signed_checkout_info.checkout_info.price,
            available_payment_methods: signed_checkout_info.checkout_info.payment_methods.clone(),
            signed_checkout_info,
        }
    }
}

/// Checkout backend - outbound port.
///
/// One call per reconciliation. Transport concerns (retries, TLS) live in
/// the implementation.
#[async_trait]
pub trait CheckoutApi: Send + Sync {
    /// Price `cart` and return the signed checkout info.
    async fn create_checkout_info(
        &self,
        cart: BackendCart,
    ) -> Result<CheckoutInfoResponse, CheckoutFailure>;
}

/// Online product catalog - outbound port.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    /// Find a product by SKU.
    async fn find_by_sku_online(&self, sku: &str) -> Result<Product, LookupError>;
}

/// How soon a reconciliation should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Now, even if the cart looks up to date.
    Immediate,
    /// After the debounce delay; restarted by every request.
    Debounced,
}

/// Receives reconciliation requests from cart mutations.
///
/// Called synchronously right after a mutation commits.
pub trait UpdateScheduler: Send + Sync {
    /// Ask for a reconciliation.
    fn request_update(&self, mode: UpdateMode);
}

/// Scheduler used until a reconciliation coordinator is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScheduler;

impl UpdateScheduler for NoopScheduler {
    fn request_update(&self, _mode: UpdateMode) {}
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}
