//! # Shared Types Crate
//!
//! This crate contains the catalog and checkout entities shared by the cart
//! engine, the checkout backend port and persistence.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Wire Compatible**: Every type is `serde` (de)serializable; enums the
//!   backend may extend carry an `Unknown` fallback variant.
//! - **Integer Money**: Prices are `Cents`; rounding is explicit.

pub mod checkout;
pub mod entities;

pub use checkout::*;
pub use entities::*;
