//! # Checkout Entities
//!
//! Types returned by the pricing/checkout backend when it prices a cart.
//! The backend answer is authoritative: its line items, violations and
//! totals replace the locally derived view.

use crate::entities::{Cents, Unit};
use serde::{Deserialize, Serialize};

/// Kind of a backend line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineItemType {
    /// A priced product line.
    #[default]
    Default,
    /// A deposit charge, usually referring to a product line.
    Deposit,
    /// A discount, either on a line (`refers_to`) or on the whole cart.
    Discount,
    /// A free item.
    Giveaway,
    /// A redeemed coupon.
    Coupon,
    /// Kinds this client does not know yet.
    #[serde(other)]
    Unknown,
}

/// A line of a priced cart as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line identifier. For product lines this equals the cart item id.
    pub id: String,
    /// Kind of line.
    #[serde(rename = "type", default)]
    pub kind: LineItemType,
    /// SKU of the priced product, if any.
    #[serde(default)]
    pub sku: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Piece count.
    #[serde(default)]
    pub amount: i64,
    /// Weight, when priced by weight.
    #[serde(default)]
    pub weight: Option<i64>,
    /// Unit of `weight`.
    #[serde(default)]
    pub weight_unit: Option<Unit>,
    /// Units, when priced per unit of measure.
    #[serde(default)]
    pub units: Option<i64>,
    /// Unit price.
    #[serde(default)]
    pub price: Cents,
    /// Total of this line.
    #[serde(default)]
    pub total_price: Cents,
    /// Line this entry applies to (deposit, discount, coupon).
    #[serde(default)]
    pub refers_to: Option<String>,
    /// Backend coupon identifier for coupon lines.
    #[serde(default)]
    pub coupon_id: Option<String>,
    /// Discount category used to group cart-level discounts.
    #[serde(default)]
    pub discount_type: Option<String>,
    /// Code the backend priced this line from.
    #[serde(default)]
    pub scanned_code: Option<String>,
}

impl LineItem {
    /// A line of `kind` with only the identifying fields set.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: LineItemType, total_price: Cents) -> Self {
        Self {
            id: id.into(),
            kind,
            sku: None,
            name: String::new(),
            amount: 1,
            weight: None,
            weight_unit: None,
            units: None,
            price: total_price,
            total_price,
            refers_to: None,
            coupon_id: None,
            discount_type: None,
            scanned_code: None,
        }
    }

    /// Quantity the backend priced: weight, then units, then amount.
    #[must_use]
    pub fn effective_quantity(&self) -> i64 {
        self.weight.or(self.units).unwrap_or(self.amount)
    }
}

/// Why the backend rejected part of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// The coupon does not exist or is not valid for this shop.
    CouponInvalid,
    /// The coupon exists but is not valid right now.
    CouponCurrentlyNotValid,
    /// The coupon was already redeemed.
    CouponAlreadyVoided,
    /// Violations this client does not know yet.
    #[serde(other)]
    Unknown,
}

/// A backend-reported violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Kind of violation.
    #[serde(rename = "type")]
    pub kind: ViolationType,
    /// Identifier of the offending coupon or line.
    pub refers_to: String,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

/// A violation as surfaced to the shopper, one per offending reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationNotification {
    /// Identifier of the offending coupon or line.
    pub refers_to: String,
    /// Name of the removed coupon, if it was in the cart.
    #[serde(default)]
    pub name: Option<String>,
    /// Kind of violation.
    pub kind: ViolationType,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

impl ViolationNotification {
    /// Build a notification for `violation`, naming the affected coupon.
    #[must_use]
    pub fn from_violation(violation: &Violation, name: Option<String>) -> Self {
        Self {
            refers_to: violation.refers_to.clone(),
            name,
            kind: violation.kind,
            message: violation.message.clone(),
        }
    }
}

/// Cart total, gross and net of tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Price {
    /// Gross total.
    pub price: Cents,
    /// Net total.
    pub net_price: Cents,
}

/// Payment methods the backend may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Debit via SEPA mandate.
    DeDirectDebit,
    /// Visa card.
    CreditCardVisa,
    /// Mastercard.
    CreditCardMastercard,
    /// American Express.
    CreditCardAmericanExpress,
    /// Pay at a supervised terminal.
    GatekeeperTerminal,
    /// Pay at a cash register using a QR code.
    QrCodePos,
    /// Google Pay.
    GooglePay,
    /// Apple Pay.
    ApplePay,
    /// Methods this client does not know yet.
    #[serde(other)]
    Unknown,
}

/// A payment method offered for a checkout, with accepted origins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodInfo {
    /// The method.
    pub method: PaymentMethod,
    /// Accepted credential origin types.
    #[serde(default)]
    pub accepted_origin_types: Vec<String>,
}

/// The backend's pricing of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CheckoutInfo {
    /// Authoritative line items.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    /// Rejected coupons and lines.
    #[serde(default)]
    pub violations: Vec<Violation>,
    /// Cart total.
    #[serde(default)]
    pub price: Price,
    /// Methods the shopper may pay with.
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethodInfo>,
}

/// A checkout info as signed by the backend, presented again at payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SignedCheckoutInfo {
    /// The priced cart.
    pub checkout_info: CheckoutInfo,
    /// Backend signature over `checkout_info`.
    #[serde(default)]
    pub signature: String,
}

/// Tax treatment chosen by the shopper (eat in or take away).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Taxation {
    /// No decision yet.
    #[default]
    Unspecified,
    /// Consumed in the shop.
    InHouse,
    /// Taken away.
    TakeAway,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_effective_quantity() {
        let mut item = LineItem::new("a", LineItemType::Default, 100);
        item.amount = 3;
        assert_eq!(item.effective_quantity(), 3);
        item.units = Some(5);
        assert_eq!(item.effective_quantity(), 5);
        item.weight = Some(250);
        assert_eq!(item.effective_quantity(), 250);
    }

    #[test]
    fn test_unknown_kinds_deserialize() {
        let json = r#"{"id":"x","type":"bonus_points","total_price":0}"#;
        let item: LineItem = serde_json::from_str(json).expect("line item");
        assert_eq!(item.kind, LineItemType::Unknown);

        let violation: Violation =
            serde_json::from_str(r#"{"type":"something_new","refers_to":"c1"}"#)
                .expect("violation");
        assert_eq!(violation.kind, ViolationType::Unknown);
        assert!(violation.message.is_empty());
    }

    #[test]
    fn test_checkout_info_defaults() {
        let info: CheckoutInfo = serde_json::from_str("{}").expect("checkout info");
        assert!(info.line_items.is_empty());
        assert_eq!(info.price, Price::default());
    }
}
