//! # Cart Runtime Library
//!
//! Wires the cart subsystems together. The `cart-runtime` binary runs a
//! scripted session against mock collaborators.

#![warn(missing_docs)]

pub mod container;

pub use container::{CartContainer, Collaborators, ConfigError, RuntimeConfig};
