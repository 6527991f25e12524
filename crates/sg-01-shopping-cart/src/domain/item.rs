//! # Cart Item
//!
//! A single cart line: a product purchase, a scanned coupon or a line the
//! backend added on its own (deposit, discount, giveaway).
//!
//! Items hold no reference to their cart. Everything a derivation needs
//! from project configuration arrives as a [`PriceContext`].

use serde::{Deserialize, Serialize};
use shared_types::{
    Cents, Coupon, CouponType, LineItem, LineItemType, Product, RoundingMode, ScannedCode, Unit,
};
use uuid::Uuid;

use super::errors::CartError;

/// Upper bound for a product's unit counter.
pub const MAX_QUANTITY: i64 = 99_999;

/// Pricing inputs taken from project configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceContext {
    /// Rounding for measured quantities.
    pub rounding_mode: RoundingMode,
    /// Whether the shopper presented a loyalty card.
    pub customer_card: bool,
}

/// What the item represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemPayload {
    /// A scanned product.
    Product {
        /// The catalog product.
        product: Product,
        /// The code it was scanned with.
        scanned_code: ScannedCode,
        /// Unit counter (pieces, or grams for user-weighed products).
        quantity: i64,
        /// The shopper entered the quantity explicitly.
        #[serde(default)]
        uses_specified_quantity: bool,
    },
    /// A scanned coupon.
    Coupon {
        /// The coupon.
        coupon: Coupon,
        /// The code it was scanned with.
        #[serde(default)]
        scanned_code: Option<ScannedCode>,
    },
    /// A line only the backend knows about.
    LineItem {
        /// The backend line.
        line_item: LineItem,
    },
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Join key with backend line items.
    pub id: String,
    /// What the item represents.
    pub payload: ItemPayload,
    /// Backend line attached by reconciliation.
    #[serde(default)]
    pub line_item: Option<LineItem>,
    /// Manual coupon the shopper applied to this product.
    #[serde(default)]
    pub manual_coupon: Option<Coupon>,
    /// The backend confirmed `manual_coupon`.
    #[serde(default)]
    pub manual_coupon_applied: bool,
    /// Backend coupon id of a coupon item.
    #[serde(default)]
    pub backend_coupon_id: Option<String>,
}

impl CartItem {
    fn with_payload(payload: ItemPayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            line_item: None,
            manual_coupon: None,
            manual_coupon_applied: false,
            backend_coupon_id: None,
        }
    }

    /// A product item with quantity 1.
    pub fn product(product: Product, scanned_code: ScannedCode) -> Self {
        Self::with_payload(ItemPayload::Product {
            product,
            scanned_code,
            quantity: 1,
            uses_specified_quantity: false,
        })
    }

    /// A product item whose quantity the shopper entered.
    ///
    /// The quantity is clamped to `1..=MAX_QUANTITY`.
    pub fn product_with_quantity(product: Product, scanned_code: ScannedCode, quantity: i64) -> Self {
        Self::with_payload(ItemPayload::Product {
            product,
            scanned_code,
            quantity: quantity.clamp(1, MAX_QUANTITY),
            uses_specified_quantity: true,
        })
    }

    /// A scanned coupon.
    pub fn coupon(coupon: Coupon, scanned_code: Option<ScannedCode>) -> Self {
        Self::with_payload(ItemPayload::Coupon {
            coupon,
            scanned_code,
        })
    }

    /// An item wrapping a backend-only line. Keeps the line's id.
    pub fn from_line_item(line_item: LineItem) -> Self {
        Self {
            id: line_item.id.clone(),
            ..Self::with_payload(ItemPayload::LineItem { line_item })
        }
    }

    /// The product of a product item.
    pub fn product_ref(&self) -> Option<&Product> {
        match &self.payload {
            ItemPayload::Product { product, .. } => Some(product),
            _ => None,
        }
    }

    /// The coupon of a coupon item.
    pub fn coupon_ref(&self) -> Option<&Coupon> {
        match &self.payload {
            ItemPayload::Coupon { coupon, .. } => Some(coupon),
            _ => None,
        }
    }

    /// The code this item was scanned with.
    pub fn scanned_code(&self) -> Option<&ScannedCode> {
        match &self.payload {
            ItemPayload::Product { scanned_code, .. } => Some(scanned_code),
            ItemPayload::Coupon { scanned_code, .. } => scanned_code.as_ref(),
            ItemPayload::LineItem { .. } => None,
        }
    }

    /// Whether this is a product item.
    pub fn is_product(&self) -> bool {
        matches!(self.payload, ItemPayload::Product { .. })
    }

    /// Whether this is a scanned coupon.
    pub fn is_coupon(&self) -> bool {
        matches!(self.payload, ItemPayload::Coupon { .. })
    }

    /// Whether this line exists only on the backend.
    pub fn is_backend_line(&self) -> bool {
        matches!(self.payload, ItemPayload::LineItem { .. })
    }

    /// SKU of the product or backend line.
    pub fn sku(&self) -> Option<&str> {
        match &self.payload {
            ItemPayload::Product { product, .. } => Some(&product.sku),
            ItemPayload::LineItem { line_item } => line_item.sku.as_deref(),
            ItemPayload::Coupon { .. } => None,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match &self.payload {
            ItemPayload::Product { product, .. } => &product.name,
            ItemPayload::Coupon { coupon, .. } => &coupon.name,
            ItemPayload::LineItem { line_item } => &line_item.name,
        }
    }

    /// The backend line describing this item, owned or attached.
    pub fn line_item(&self) -> Option<&LineItem> {
        match &self.payload {
            ItemPayload::LineItem { line_item } => Some(line_item),
            _ => self.line_item.as_ref(),
        }
    }

    /// Identifier the backend uses for this coupon item.
    pub fn backend_coupon_key(&self) -> Option<&str> {
        self.backend_coupon_id
            .as_deref()
            .or_else(|| self.coupon_ref().map(|coupon| coupon.id.as_str()))
    }

    /// Unit of the quantity: the scanned code's embedded unit, else the
    /// product's encoding unit.
    pub fn unit(&self) -> Option<Unit> {
        match &self.payload {
            ItemPayload::Product {
                product,
                scanned_code,
                ..
            } => scanned_code.embedded_unit.or(product.encoding_unit),
            ItemPayload::LineItem { line_item } => line_item.weight_unit,
            ItemPayload::Coupon { .. } => None,
        }
    }

    /// The raw unit counter.
    pub fn quantity(&self) -> i64 {
        match &self.payload {
            ItemPayload::Product { quantity, .. } => *quantity,
            ItemPayload::LineItem { line_item } => line_item.amount,
            ItemPayload::Coupon { .. } => 1,
        }
    }

    /// The quantity used for pricing.
    ///
    /// Non-zero embedded data wins, then the attached line item's priced
    /// quantity, then the unit counter.
    pub fn effective_quantity(&self) -> i64 {
        if let Some(code) = self.scanned_code() {
            if code.has_embedded_data() {
                return code.embedded_data.unwrap_or_default();
            }
        }
        match self.line_item() {
            Some(line_item) => line_item.effective_quantity(),
            None => self.quantity(),
        }
    }

    /// Set the unit counter of a product item.
    pub fn set_quantity(&mut self, value: i64) -> Result<(), CartError> {
        if !(1..=MAX_QUANTITY).contains(&value) {
            return Err(CartError::InvalidQuantity(value));
        }
        match &mut self.payload {
            ItemPayload::Product { quantity, .. } => {
                *quantity = value;
                Ok(())
            }
            _ => Err(CartError::NotAProduct(self.id.clone())),
        }
    }

    /// Attach or detach a manual coupon. Only `Manual` coupons are accepted.
    pub fn set_manual_coupon(&mut self, coupon: Option<Coupon>) -> Result<(), CartError> {
        if !self.is_product() {
            return Err(CartError::NotAProduct(self.id.clone()));
        }
        if let Some(coupon) = &coupon {
            if coupon.coupon_type != CouponType::Manual {
                return Err(CartError::NotAManualCoupon(coupon.id.clone()));
            }
        }
        self.manual_coupon = coupon;
        self.manual_coupon_applied = false;
        Ok(())
    }

    /// Whether another scan of the same product can be folded into this item.
    pub fn is_mergeable(&self, ctx: PriceContext) -> bool {
        let ItemPayload::Product {
            product,
            scanned_code,
            uses_specified_quantity,
            ..
        } = &self.payload
        else {
            return false;
        };

        let unit_blocks = self
            .unit()
            .is_some_and(|unit| unit.is_weight() || unit == Unit::Price);

        product.product_type == shared_types::ProductType::Article
            && !unit_blocks
            && product.price(ctx.customer_card) != 0
            && !scanned_code.has_embedded_data()
            && !uses_specified_quantity
    }

    /// Total price of this line, deposit excluded.
    pub fn total_price(&self, ctx: PriceContext) -> Cents {
        if let Some(line_item) = self.line_item() {
            return line_item.total_price;
        }
        match &self.payload {
            ItemPayload::Product { product, .. } => product.price_for_quantity(
                self.effective_quantity(),
                self.unit(),
                ctx.rounding_mode,
                ctx.customer_card,
            ),
            ItemPayload::Coupon { .. } | ItemPayload::LineItem { .. } => 0,
        }
    }

    /// Locally derived deposit for this line.
    pub fn deposit_price(&self, ctx: PriceContext) -> Cents {
        let Some(product) = self.product_ref() else {
            return 0;
        };
        let per_unit = product.deposit_price(ctx.customer_card);
        if per_unit == 0 {
            return 0;
        }
        let quantity = if product.is_weighed() {
            1
        } else {
            self.effective_quantity()
        };
        per_unit.saturating_mul(quantity)
    }

    /// Whether this is a backend deposit line.
    pub fn is_deposit_line(&self) -> bool {
        matches!(
            &self.payload,
            ItemPayload::LineItem { line_item } if line_item.kind == LineItemType::Deposit
        )
    }

    /// Contribution to the cart's item count.
    ///
    /// Weighed products and products counted in pieces count once; backend
    /// product lines count their amount; coupons and other lines count zero.
    pub fn counted_quantity(&self) -> i64 {
        match &self.payload {
            ItemPayload::Product { product, .. } => {
                if product.is_weighed() || self.unit() == Some(Unit::Piece) {
                    1
                } else {
                    self.effective_quantity()
                }
            }
            ItemPayload::LineItem { line_item } if line_item.kind == LineItemType::Default => {
                line_item.amount
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ProductType;

    fn ctx() -> PriceContext {
        PriceContext::default()
    }

    fn milk() -> Product {
        Product::article("milk", "Milk", 129)
    }

    fn cheese() -> Product {
        Product {
            product_type: ProductType::PreWeighed,
            reference_unit: Some(Unit::Kilogram),
            encoding_unit: Some(Unit::Gram),
            ..Product::article("cheese", "Cheese", 1999)
        }
    }

    fn manual_coupon() -> Coupon {
        Coupon {
            id: "mc-1".into(),
            name: "10% off".into(),
            coupon_type: CouponType::Manual,
            code: None,
        }
    }

    #[test]
    fn test_plain_article_is_mergeable() {
        let item = CartItem::product(milk(), ScannedCode::plain("4000001"));
        assert!(item.is_mergeable(ctx()));
        assert_eq!(item.total_price(ctx()), 129);
    }

    #[test]
    fn test_specified_quantity_blocks_merge() {
        let item = CartItem::product_with_quantity(milk(), ScannedCode::plain("4000001"), 3);
        assert!(!item.is_mergeable(ctx()));
        assert_eq!(item.total_price(ctx()), 387);
    }

    #[test]
    fn test_embedded_weight_blocks_merge_and_prices() {
        let item = CartItem::product(cheese(), ScannedCode::embedded("2812345002504", 250, Unit::Gram));
        assert!(!item.is_mergeable(ctx()));
        assert_eq!(item.effective_quantity(), 250);
        // 1999 per kg * 0.25 kg = 499.75
        assert_eq!(item.total_price(ctx()), 500);
    }

    #[test]
    fn test_zero_price_blocks_merge() {
        let item = CartItem::product(Product::article("free", "Bag", 0), ScannedCode::plain("1"));
        assert!(!item.is_mergeable(ctx()));
    }

    #[test]
    fn test_coupon_and_line_items_never_merge() {
        let coupon = Coupon {
            coupon_type: CouponType::Printed,
            ..manual_coupon()
        };
        assert!(!CartItem::coupon(coupon, None).is_mergeable(ctx()));
        let line = CartItem::from_line_item(LineItem::new("d", LineItemType::Discount, -50));
        assert!(!line.is_mergeable(ctx()));
        assert_eq!(line.id, "d");
    }

    #[test]
    fn test_embedded_price_is_total() {
        let item = CartItem::product(milk(), ScannedCode::embedded("2900000004556", 455, Unit::Price));
        assert_eq!(item.total_price(ctx()), 455);
    }

    #[test]
    fn test_attached_line_item_wins() {
        let mut item = CartItem::product(milk(), ScannedCode::plain("4000001"));
        let mut line = LineItem::new(item.id.clone(), LineItemType::Default, 99);
        line.amount = 1;
        item.line_item = Some(line);
        assert_eq!(item.total_price(ctx()), 99);
    }

    #[test]
    fn test_line_item_quantity_used_without_embedded_data() {
        let mut item = CartItem::product(milk(), ScannedCode::plain("4000001"));
        let mut line = LineItem::new(item.id.clone(), LineItemType::Default, 258);
        line.amount = 2;
        item.line_item = Some(line);
        assert_eq!(item.effective_quantity(), 2);
    }

    #[test]
    fn test_set_quantity_bounds() {
        let mut item = CartItem::product(milk(), ScannedCode::plain("4000001"));
        assert!(item.set_quantity(5).is_ok());
        assert_eq!(item.quantity(), 5);
        assert_eq!(item.set_quantity(0), Err(CartError::InvalidQuantity(0)));
        assert_eq!(
            item.set_quantity(MAX_QUANTITY + 1),
            Err(CartError::InvalidQuantity(MAX_QUANTITY + 1))
        );
    }

    #[test]
    fn test_manual_coupon_type_checked() {
        let mut item = CartItem::product(milk(), ScannedCode::plain("4000001"));
        assert!(item.set_manual_coupon(Some(manual_coupon())).is_ok());

        let digital = Coupon {
            id: "dc".into(),
            coupon_type: CouponType::Digital,
            ..manual_coupon()
        };
        assert_eq!(
            item.set_manual_coupon(Some(digital)),
            Err(CartError::NotAManualCoupon("dc".into()))
        );
        assert_eq!(item.manual_coupon, Some(manual_coupon()));
    }

    #[test]
    fn test_deposit_counts_weighed_once() {
        let deposit = Some(Box::new(Product::article("dep", "Deposit", 25)));
        let mut water = CartItem::product(
            Product {
                deposit_product: deposit.clone(),
                ..Product::article("water", "Water", 49)
            },
            ScannedCode::plain("4000002"),
        );
        water.set_quantity(3).expect("quantity");
        assert_eq!(water.deposit_price(ctx()), 75);

        let weighed = CartItem::product(
            Product {
                deposit_product: deposit,
                ..cheese()
            },
            ScannedCode::embedded("2812345002504", 250, Unit::Gram),
        );
        assert_eq!(weighed.deposit_price(ctx()), 25);
    }

    #[test]
    fn test_counted_quantity() {
        let mut milk = CartItem::product(milk(), ScannedCode::plain("4000001"));
        milk.set_quantity(4).expect("quantity");
        assert_eq!(milk.counted_quantity(), 4);

        let cheese = CartItem::product(cheese(), ScannedCode::embedded("2812345002504", 250, Unit::Gram));
        assert_eq!(cheese.counted_quantity(), 1);

        let mut line = LineItem::new("x", LineItemType::Default, 100);
        line.amount = 2;
        assert_eq!(CartItem::from_line_item(line).counted_quantity(), 2);
        assert_eq!(
            CartItem::from_line_item(LineItem::new("d", LineItemType::Deposit, 25)).counted_quantity(),
            0
        );
    }

    #[test]
    fn test_serde_roundtrip_keeps_payload_kind() {
        let item = CartItem::product(milk(), ScannedCode::plain("4000001"));
        let json = serde_json::to_string(&item).expect("serialize");
        assert!(json.contains("\"kind\":\"product\""));
        let back: CartItem = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, item);
    }
}
