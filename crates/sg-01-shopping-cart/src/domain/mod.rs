//! Domain layer for the Shopping Cart subsystem.
//!
//! Pure data and invariant bookkeeping. Nothing here locks, spawns or
//! publishes.

pub mod errors;
pub mod item;
pub mod reconcile;
pub mod snapshot;
pub mod state;

pub use errors::{CartError, CheckoutFailure, LookupError, ReconcileError};
pub use item::{CartItem, ItemPayload, PriceContext, MAX_QUANTITY};
pub use reconcile::{apply_checkout_info, substituted_skus, ApplySummary, CART_DISCOUNT_NAME};
pub use snapshot::{BackendCart, BackendCartItem, BackendIdentity, BackendQuantity};
pub use state::{CartBackup, CartState, Insertion, LimitCrossing, ViolationResolution};
