//! # Shopping Cart Subsystem
//!
//! **Subsystem ID:** 1
//!
//! ## Purpose
//!
//! Holds the shopper's in-progress purchase and keeps it priced by the
//! checkout backend. Local edits never wait for the backend: every edit
//! bumps the modification count, the coordinator sends a snapshot tagged
//! with that count, and an answer is only applied if the count is still the
//! same when it arrives.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Modification count never decreases | `domain/state.rs` - `touch()`, `replace_with()` |
//! | Coupons sort after all other items | `domain/state.rs` - `insert()` |
//! | Stale answers are never applied | `service.rs` - `commit_checkout_info()` |
//! | Desync leaves the cart untouched | `domain/reconcile.rs` - `apply_checkout_info()` |
//! | One limit notification per crossing | `domain/state.rs` - `update_limits()` |
//!
//! ## Reconciliation Protocol
//!
//! ```text
//! mutation ──debounced──→ [Idle] ──timer──→ [RequestInFlight { token }]
//!     │                     ↑                    │
//!     └──remove/restore─────┘ (forced)           ├─ token current ──→ Applied
//!                                                ├─ token stale ────→ Discarded
//!                                                └─ rejection ──────→ Errored
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/  - mock backend, catalog, clock and scheduler        │
//! │  updater/   - CartUpdater coordinator, Debouncer                │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements / drives ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/outbound.rs - CheckoutApi, ProductLookup, TimeSource,    │
//! │                      UpdateScheduler                            │
//! │  service.rs        - ShoppingCart engine                        │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/item.rs      - CartItem, ItemPayload                    │
//! │  domain/state.rs     - CartState, backup, limits                │
//! │  domain/snapshot.rs  - BackendCart                              │
//! │  domain/reconcile.rs - applying checkout info                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;
pub mod updater;

pub use config::CartConfig;
pub use domain::{
    BackendCart, BackendCartItem, BackendQuantity, CartBackup, CartError, CartItem, CartState,
    CheckoutFailure, ItemPayload, LookupError, PriceContext, ReconcileError, MAX_QUANTITY,
};
pub use ports::{
    CheckoutApi, CheckoutInfoResponse, NoopScheduler, ProductLookup, SystemTimeSource, TimeSource,
    UpdateMode, UpdateScheduler,
};
pub use service::{CheckoutSnapshot, Commit, ShoppingCart};
pub use updater::{CartUpdater, Debouncer, ReconcileOutcome, SkipReason, UpdatePhase};
