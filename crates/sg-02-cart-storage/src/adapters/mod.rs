//! Adapters for the Cart Storage subsystem.

pub mod storage;

pub use storage::{FileCartStore, InMemoryCartStore};
