//! # Backend Cart
//!
//! The cart as sent to the checkout backend for pricing. Built from a
//! `CartState` snapshot; backend-only lines are never sent back.

use serde::{Deserialize, Serialize};
use shared_types::{Cents, Taxation, Unit};

use super::item::{CartItem, ItemPayload};
use super::state::CartState;

/// Quantity of a backend cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendQuantity {
    /// Counted pieces.
    Amount {
        /// Piece count.
        value: i64,
    },
    /// A measured weight.
    Weight {
        /// Weight in `unit`.
        value: i64,
        /// Unit of `value`.
        unit: Unit,
    },
    /// Measured units other than weight (volume, embedded piece counts).
    Units {
        /// Unit count.
        value: i64,
    },
    /// An embedded price.
    Price {
        /// Price in cents.
        value: Cents,
    },
}

/// One line of the backend cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCartItem {
    /// Cart item id; echoed back as the line item id.
    pub id: String,
    /// SKU for product lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Code the item was scanned with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_code: Option<String>,
    /// Priced quantity.
    pub quantity: BackendQuantity,
    /// Coupon to redeem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_id: Option<String>,
    /// Product line a manual coupon applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refers_to: Option<String>,
}

/// The cart as priced by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCart {
    /// Session identifier.
    pub session: String,
    /// Shop the cart is priced in.
    pub shop_id: String,
    /// Client identifier.
    pub client_id: String,
    /// App user, if signed in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_user_id: Option<String>,
    /// Loyalty card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_card: Option<String>,
    /// Tax treatment, when decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_taxation: Option<Taxation>,
    /// Cart lines.
    pub items: Vec<BackendCartItem>,
}

/// Identity fields the backend cart carries besides the items.
#[derive(Debug, Clone, Default)]
pub struct BackendIdentity {
    /// Client identifier.
    pub client_id: String,
    /// App user identifier.
    pub app_user_id: Option<String>,
    /// Loyalty card.
    pub customer_card: Option<String>,
}

fn backend_quantity(item: &CartItem) -> BackendQuantity {
    let quantity = item.effective_quantity();
    let embedded = item.scanned_code().is_some_and(|code| code.has_embedded_data());
    match item.unit() {
        Some(Unit::Price) if embedded => BackendQuantity::Price { value: quantity },
        Some(unit) if unit.is_weight() => BackendQuantity::Weight {
            value: quantity,
            unit,
        },
        Some(unit) if unit.is_measure() || (embedded && unit == Unit::Piece) => {
            BackendQuantity::Units { value: quantity }
        }
        _ => BackendQuantity::Amount {
            value: item.quantity(),
        },
    }
}

fn backend_items(item: &CartItem) -> Vec<BackendCartItem> {
    match &item.payload {
        ItemPayload::Product {
            product,
            scanned_code,
            ..
        } => {
            let mut lines = vec![BackendCartItem {
                id: item.id.clone(),
                sku: Some(product.sku.clone()),
                scanned_code: Some(scanned_code.code.clone()),
                quantity: backend_quantity(item),
                coupon_id: None,
                refers_to: None,
            }];
            if let Some(coupon) = &item.manual_coupon {
                lines.push(BackendCartItem {
                    id: format!("{}-coupon", item.id),
                    sku: None,
                    scanned_code: coupon.code.clone(),
                    quantity: BackendQuantity::Amount { value: 1 },
                    coupon_id: Some(coupon.id.clone()),
                    refers_to: Some(item.id.clone()),
                });
            }
            lines
        }
        ItemPayload::Coupon {
            coupon,
            scanned_code,
        } => vec![BackendCartItem {
            id: item.id.clone(),
            sku: None,
            scanned_code: scanned_code.as_ref().map(|code| code.code.clone()),
            quantity: BackendQuantity::Amount { value: 1 },
            coupon_id: Some(coupon.id.clone()),
            refers_to: None,
        }],
        ItemPayload::LineItem { .. } => Vec::new(),
    }
}

impl BackendCart {
    /// Build the backend cart for `state`. `None` when no shop is set.
    pub fn from_state(state: &CartState, identity: &BackendIdentity) -> Option<Self> {
        let shop_id = state.shop_id.clone()?;
        Some(Self {
            session: state.session_id.clone(),
            shop_id,
            client_id: identity.client_id.clone(),
            app_user_id: identity.app_user_id.clone(),
            customer_card: identity.customer_card.clone(),
            requires_taxation: match state.taxation {
                Taxation::Unspecified => None,
                taxation => Some(taxation),
            },
            items: state.items.iter().flat_map(backend_items).collect(),
        })
    }
}
