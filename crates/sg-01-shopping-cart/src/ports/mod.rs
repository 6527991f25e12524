//! Ports (hexagonal boundaries) for the Shopping Cart subsystem.

pub mod outbound;

pub use outbound::{
    CheckoutApi, CheckoutInfoResponse, NoopScheduler, ProductLookup, SystemTimeSource,
    TimeSource, UpdateMode, UpdateScheduler,
};
