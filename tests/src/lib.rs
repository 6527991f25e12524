//! # Scan & Go Test Suite
//!
//! Unified test crate for behavior that spans subsystems.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Cart, coordinator, storage and runtime together
//!     ├── flows.rs      # Scanning and reconciliation through the bus
//!     └── persistence.rs# Saved carts across runtime restarts
//! tests/benches/
//! └── cart_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sg-tests
//! cargo test -p sg-tests integration::persistence
//!
//! # Benchmarks
//! cargo bench -p sg-tests
//! ```

pub mod integration;
