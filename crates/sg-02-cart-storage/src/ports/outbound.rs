//! Outbound ports of the Cart Storage subsystem.

use crate::domain::{StorageError, StorageKey};

/// Byte-level cart storage - outbound port.
///
/// Calls block; the persistence service runs them on the blocking pool.
pub trait CartStore: Send + Sync {
    /// Read the cart stored under `key`. `Ok(None)` when nothing is stored.
    fn read(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the cart stored under `key`.
    fn write(&self, key: &StorageKey, bytes: &[u8]) -> Result<(), StorageError>;
}
