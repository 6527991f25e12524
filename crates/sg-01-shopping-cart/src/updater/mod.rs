//! Reconciliation against the checkout backend.

pub mod coordinator;
pub mod debounce;

pub use coordinator::{CartUpdater, ReconcileOutcome, SkipReason, UpdatePhase};
pub use debounce::Debouncer;
