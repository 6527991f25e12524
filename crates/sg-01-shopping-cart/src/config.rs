//! # Shopping Cart Configuration
//!
//! Project-level settings the cart needs for pricing, limits and
//! reconciliation timing. Passed explicitly to the cart and its items'
//! price derivations; there is no global project object.

use serde::{Deserialize, Serialize};
use shared_types::{Cents, RoundingMode};
use std::env;
use std::time::Duration;

use crate::domain::PriceContext;

/// Default delay between the last mutation and the backend call.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1_000;

/// How long a backup stays restorable.
pub const DEFAULT_BACKUP_TTL_MS: u64 = 5 * 60 * 1_000;

/// Shopping cart configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartConfig {
    /// Total at or above which checkout is refused. 0 disables the check.
    pub max_checkout_limit: Cents,

    /// Total at or above which online payment is refused. 0 disables the check.
    pub max_online_payment_limit: Cents,

    /// Rounding applied to weighed and measured prices.
    pub rounding_mode: RoundingMode,

    /// Show net instead of gross backend totals.
    pub display_net_price: bool,

    /// Loyalty card of the shopper, sent along and used for card prices.
    pub customer_card_id: Option<String>,

    /// Client identifier sent with every backend cart.
    pub client_id: String,

    /// App user identifier sent with every backend cart.
    pub app_user_id: Option<String>,

    /// Debounce delay for reconciliation in milliseconds.
    pub debounce_delay_ms: u64,

    /// Backup lifetime in milliseconds.
    pub backup_ttl_ms: u64,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            max_checkout_limit: 0,
            max_online_payment_limit: 0,
            rounding_mode: RoundingMode::HalfUp,
            display_net_price: false,
            customer_card_id: None,
            client_id: "scango-client".to_string(),
            app_user_id: None,
            debounce_delay_ms: DEFAULT_DEBOUNCE_MS,
            backup_ttl_ms: DEFAULT_BACKUP_TTL_MS,
        }
    }
}

impl CartConfig {
    /// Create a config for testing (limits set, short debounce).
    pub fn for_testing() -> Self {
        Self {
            max_checkout_limit: 10_000,
            max_online_payment_limit: 5_000,
            client_id: "test-client".to_string(),
            app_user_id: Some("test-user".to_string()),
            debounce_delay_ms: 50,
            ..Self::default()
        }
    }

    /// Create a config from `SG_CART_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_checkout_limit: parse_env("SG_CART_MAX_CHECKOUT_LIMIT")
                .unwrap_or(defaults.max_checkout_limit),
            max_online_payment_limit: parse_env("SG_CART_MAX_ONLINE_PAYMENT_LIMIT")
                .unwrap_or(defaults.max_online_payment_limit),
            rounding_mode: env::var("SG_CART_ROUNDING_MODE")
                .ok()
                .and_then(|v| parse_rounding_mode(&v))
                .unwrap_or(defaults.rounding_mode),
            display_net_price: env::var("SG_CART_DISPLAY_NET_PRICE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.display_net_price),
            customer_card_id: env::var("SG_CART_CUSTOMER_CARD").ok(),
            client_id: env::var("SG_CLIENT_ID").unwrap_or(defaults.client_id),
            app_user_id: env::var("SG_APP_USER_ID").ok(),
            debounce_delay_ms: parse_env("SG_CART_DEBOUNCE_MS")
                .unwrap_or(defaults.debounce_delay_ms),
            backup_ttl_ms: parse_env("SG_CART_BACKUP_TTL_MS").unwrap_or(defaults.backup_ttl_ms),
        }
    }

    /// Debounce delay as a `Duration`.
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    /// Pricing context handed to item derivations.
    pub fn price_context(&self) -> PriceContext {
        PriceContext {
            rounding_mode: self.rounding_mode,
            customer_card: self.customer_card_id.is_some(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_rounding_mode(value: &str) -> Option<RoundingMode> {
    match value.to_lowercase().as_str() {
        "up" => Some(RoundingMode::Up),
        "down" => Some(RoundingMode::Down),
        "half_up" | "halfup" => Some(RoundingMode::HalfUp),
        _ => None,
    }
}
