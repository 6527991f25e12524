//! # Domain Errors
//!
//! Error types for the shopping cart and its reconciliation.

use shared_types::Product;
use thiserror::Error;

/// Misuse of the cart API. The cart is left unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    /// No item at the given position.
    #[error("No item at index {index} (cart has {len} items)")]
    IndexOutOfBounds {
        /// Requested position
        index: usize,
        /// Current cart length
        len: usize,
    },

    /// Only manual coupons can be attached to a product.
    #[error("Coupon {0} is not a manual coupon")]
    NotAManualCoupon(String),

    /// The operation needs a product item.
    #[error("Item {0} is not a product")]
    NotAProduct(String),

    /// Quantity outside `1..=MAX_QUANTITY`.
    #[error("Quantity {0} is out of range")]
    InvalidQuantity(i64),
}

/// Failure reported by the checkout backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckoutFailure {
    /// No shop is checked in, or the backend does not know it.
    #[error("No shop found")]
    NoShopFound,

    /// Products that may not be sold.
    #[error("{} invalid products", .0.len())]
    InvalidProducts(Vec<Product>),

    /// No payment method is available for this cart.
    #[error("No payment method available")]
    NoPaymentMethod,

    /// The scanned deposit return voucher was rejected.
    #[error("Invalid deposit return voucher")]
    InvalidDepositReturnVoucher,

    /// Any other backend error.
    #[error("Unknown backend error: {0}")]
    UnknownError(String),

    /// The backend could not be reached.
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Why a reconciliation failed after its response was accepted as current.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// The backend rejected the cart.
    #[error("Checkout info rejected: {0}")]
    Rejected(#[from] CheckoutFailure),

    /// The backend priced a different cart than the one held locally.
    #[error("Backend cart out of sync: {} items without line item", .missing.len())]
    Desync {
        /// Local item ids the backend did not return.
        missing: Vec<String>,
    },
}

/// Product lookup failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// The SKU is unknown.
    #[error("Product not found: {0}")]
    NotFound(String),

    /// The lookup service could not be reached.
    #[error("Lookup failed: {0}")]
    Unavailable(String),
}
