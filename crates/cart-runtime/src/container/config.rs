//! # Runtime Configuration
//!
//! Unified configuration for all cart subsystems.
//!
//! ## Validation
//!
//! - Spending limits must not be negative (0 disables a limit)
//! - The online payment limit cannot exceed an enabled checkout limit

use scango_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use sg_01_shopping_cart::CartConfig;
use sg_02_cart_storage::StorageConfig;
use thiserror::Error;
use tracing::info;

/// Default capacity of the cart event bus.
pub const DEFAULT_BUS_CAPACITY: usize = shared_bus::DEFAULT_CHANNEL_CAPACITY;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Shop the shopper is checked into, if any.
    pub shop_id: Option<String>,
    /// Cart engine and reconciliation settings.
    pub cart: CartConfig,
    /// Persistence settings.
    pub storage: StorageConfig,
    /// Logging settings.
    pub telemetry: TelemetryConfig,
    /// Event bus capacity; 0 selects the default.
    pub bus_capacity: usize,
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A spending limit is negative.
    #[error("{name} must not be negative, got {value}")]
    NegativeLimit {
        /// Offending setting.
        name: &'static str,
        /// Configured value.
        value: i64,
    },

    /// The online payment limit is above the checkout limit.
    #[error("online payment limit {online} exceeds checkout limit {checkout}")]
    OnlineLimitAboveCheckoutLimit {
        /// Online payment limit.
        online: i64,
        /// Checkout limit.
        checkout: i64,
    },
}

impl RuntimeConfig {
    /// Create a config for testing.
    pub fn for_testing() -> Self {
        Self {
            shop_id: Some("test-shop".to_string()),
            cart: CartConfig::for_testing(),
            storage: StorageConfig::for_testing(),
            telemetry: TelemetryConfig::for_testing(),
            bus_capacity: 64,
        }
    }

    /// Load configuration from `SG_*` environment variables.
    pub fn from_env() -> Self {
        let config = Self {
            shop_id: std::env::var("SG_SHOP_ID").ok().filter(|s| !s.is_empty()),
            cart: CartConfig::from_env(),
            storage: StorageConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
            bus_capacity: std::env::var("SG_BUS_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_BUS_CAPACITY),
        };
        info!(
            shop_id = ?config.shop_id,
            environment = %config.storage.environment,
            "Loaded runtime configuration from environment"
        );
        config
    }

    /// Effective event bus capacity.
    pub fn effective_bus_capacity(&self) -> usize {
        if self.bus_capacity == 0 {
            DEFAULT_BUS_CAPACITY
        } else {
            self.bus_capacity
        }
    }

    /// Check the configuration for contradictions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checkout = self.cart.max_checkout_limit;
        let online = self.cart.max_online_payment_limit;
        if checkout < 0 {
            return Err(ConfigError::NegativeLimit {
                name: "max_checkout_limit",
                value: checkout,
            });
        }
        if online < 0 {
            return Err(ConfigError::NegativeLimit {
                name: "max_online_payment_limit",
                value: online,
            });
        }
        if checkout > 0 && online > checkout {
            return Err(ConfigError::OnlineLimitAboveCheckoutLimit { online, checkout });
        }
        Ok(())
    }
}
