//! In-memory cart store.

use crate::domain::{StorageError, StorageKey};
use crate::ports::CartStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory cart store for unit tests.
#[derive(Default)]
pub struct InMemoryCartStore {
    data: Mutex<HashMap<StorageKey, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryCartStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make reads fail with an I/O error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make writes fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Put raw bytes under `key`, bypassing the write counter.
    pub fn insert_raw(&self, key: StorageKey, bytes: Vec<u8>) {
        self.data.lock().insert(key, bytes);
    }

    /// Raw bytes stored under `key`.
    pub fn get_raw(&self, key: &StorageKey) -> Option<Vec<u8>> {
        self.data.lock().get(key).cloned()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CartStore for InMemoryCartStore {
    fn read(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Io {
                message: "simulated read failure".to_string(),
            });
        }
        Ok(self.data.lock().get(key).cloned())
    }

    fn write(&self, key: &StorageKey, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io {
                message: "simulated write failure".to_string(),
            });
        }
        self.data.lock().insert(key.clone(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
