//! Domain layer for the Cart Storage subsystem.

pub mod errors;
pub mod key;

pub use errors::StorageError;
pub use key::{Environment, FreshReason, LoadOutcome, StorageKey, CART_FILE_NAME};
