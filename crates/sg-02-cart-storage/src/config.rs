//! # Cart Storage Configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::Environment;

/// Default delay between the last cart event and the write.
pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 1_000;

/// Carts untouched for longer than this are not resumed.
pub const DEFAULT_MAX_CART_AGE_MS: u64 = 4 * 60 * 60 * 1_000;

/// Cart storage configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend environment; part of every storage key.
    pub environment: Environment,

    /// Directory carts are stored below.
    pub root_dir: PathBuf,

    /// Save debounce in milliseconds.
    pub save_debounce_ms: u64,

    /// Maximum age of a resumable cart in milliseconds.
    pub max_cart_age_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            root_dir: PathBuf::from("./data/carts"),
            save_debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
            max_cart_age_ms: DEFAULT_MAX_CART_AGE_MS,
        }
    }
}

impl StorageConfig {
    /// Create a config for testing (short debounce, testing environment).
    pub fn for_testing() -> Self {
        Self {
            environment: Environment::Testing,
            root_dir: std::env::temp_dir().join("scango-carts"),
            save_debounce_ms: 50,
            ..Self::default()
        }
    }

    /// Create a config from `SG_STORAGE_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            environment: env::var("SG_ENVIRONMENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.environment),
            root_dir: env::var("SG_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.root_dir),
            save_debounce_ms: env::var("SG_STORAGE_SAVE_DEBOUNCE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.save_debounce_ms),
            max_cart_age_ms: env::var("SG_STORAGE_MAX_CART_AGE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_cart_age_ms),
        }
    }

    /// Save debounce as a `Duration`.
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}
