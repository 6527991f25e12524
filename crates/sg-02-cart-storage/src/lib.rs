//! # Cart Storage Subsystem
//!
//! **Subsystem ID:** 2
//!
//! ## Purpose
//!
//! Keeps the shopping cart across restarts. One JSON file per environment
//! and shop, written a short while after the last cart event and read back
//! at startup or when the shopper checks into another shop.
//!
//! ## Layout on Disk
//!
//! ```text
//! <root_dir>/
//! ├── production/
//! │   ├── shop-1/shopping_cart.json
//! │   └── shop-2/shopping_cart.json
//! └── testing/
//!     └── shop-1/shopping_cart.json
//! ```
//!
//! ## Load Outcomes
//!
//! | Stored content | Outcome | Live cart |
//! |----------------|---------|-----------|
//! | Recent, valid | `Resumed` | Stored cart |
//! | Older than `max_cart_age` | `Expired` | Empty, new session |
//! | Missing | `Fresh(Missing)` | Empty |
//! | Undecodable | `Fresh(Malformed)` | Empty |
//! | Unreadable | `Fresh(ReadFailed)` | Empty |

#![warn(missing_docs)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{FileCartStore, InMemoryCartStore};
pub use config::StorageConfig;
pub use domain::{Environment, FreshReason, LoadOutcome, StorageError, StorageKey};
pub use ports::CartStore;
pub use service::CartPersistence;
