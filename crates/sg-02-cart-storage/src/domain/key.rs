//! Where a cart lives and how loading it went.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// File name of a persisted cart.
pub const CART_FILE_NAME: &str = "shopping_cart.json";

/// Backend environment the app talks to. Carts never cross environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Test backend.
    Testing,
    /// Staging backend.
    Staging,
    /// Production backend.
    #[default]
    Production,
}

impl Environment {
    /// Directory name for this environment.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Testing => "testing",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "testing" | "test" => Ok(Self::Testing),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Identifies one persisted cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    /// Backend environment.
    pub environment: Environment,
    /// Shop the cart belongs to.
    pub shop_id: String,
}

impl StorageKey {
    /// Key for the cart of `shop_id` in `environment`.
    pub fn new(environment: Environment, shop_id: impl Into<String>) -> Self {
        Self {
            environment,
            shop_id: shop_id.into(),
        }
    }

    /// Path relative to the storage root: `<environment>/<shop>/shopping_cart.json`.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.environment.as_str())
            .join(sanitize(&self.shop_id))
            .join(CART_FILE_NAME)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.environment, self.shop_id)
    }
}

/// Shop ids become directory names; keep them to one path component.
fn sanitize(shop_id: &str) -> String {
    let cleaned: String = shop_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Why a fresh cart was started instead of resuming one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshReason {
    /// Nothing was stored for this key.
    Missing,
    /// The stored cart could not be decoded.
    Malformed,
    /// The store could not be read.
    ReadFailed,
}

/// Result of loading a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The stored cart was resumed.
    Resumed {
        /// Number of items resumed.
        items: usize,
    },
    /// An empty cart was started.
    Fresh(FreshReason),
    /// The stored cart was too old and was replaced by an empty one.
    Expired,
}

impl LoadOutcome {
    /// Metrics label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resumed { .. } => "resumed",
            Self::Fresh(_) => "fresh",
            Self::Expired => "expired",
        }
    }
}
