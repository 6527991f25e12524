//! # Catalog Entities
//!
//! Product, scanned code and coupon types shared by the cart, the checkout
//! backend and persistence.
//!
//! ## Clusters
//!
//! - **Money**: `Cents`, `RoundingMode`
//! - **Measurement**: `Unit`, `Dimension`
//! - **Catalog**: `Product`, `ProductType`, `ScannedCode`, `Coupon`

use serde::{Deserialize, Serialize};

// =============================================================================
// CLUSTER A: MONEY
// =============================================================================

/// An amount of money in the smallest currency unit (e.g. cents).
pub type Cents = i64;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Rounding applied when a price does not divide evenly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Away from zero.
    Up,
    /// Toward zero.
    Down,
    /// To nearest, ties away from zero.
    #[default]
    HalfUp,
}

impl RoundingMode {
    /// Divide `numerator` by a positive `denominator` using this mode.
    ///
    /// A zero denominator yields zero.
    #[must_use]
    pub fn divide(self, numerator: i128, denominator: i128) -> Cents {
        if denominator == 0 {
            return 0;
        }
        let negative = (numerator < 0) != (denominator < 0);
        let n = numerator.unsigned_abs();
        let d = denominator.unsigned_abs();
        let quotient = n / d;
        let remainder = n % d;

        let magnitude = match self {
            Self::Down => quotient,
            Self::Up => quotient + u128::from(remainder != 0),
            Self::HalfUp => quotient + u128::from(remainder * 2 >= d),
        };

        let magnitude = i64::try_from(magnitude).unwrap_or(i64::MAX);
        if negative {
            -magnitude
        } else {
            magnitude
        }
    }
}

// =============================================================================
// CLUSTER B: MEASUREMENT
// =============================================================================

/// The physical dimension a unit measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Pieces.
    Count,
    /// An embedded price.
    Currency,
    /// Weight.
    Mass,
    /// Volume.
    Volume,
}

/// Unit of a quantity, either encoded in a barcode or used as a price reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Counted pieces.
    Piece,
    /// The embedded value is a price in cents.
    Price,
    /// Gram.
    Gram,
    /// 10 grams.
    Decagram,
    /// 100 grams.
    Hectogram,
    /// Kilogram.
    Kilogram,
    /// Milliliter.
    Milliliter,
    /// Liter.
    Liter,
}

impl Unit {
    /// Dimension of this unit.
    #[must_use]
    pub fn dimension(self) -> Dimension {
        match self {
            Self::Piece => Dimension::Count,
            Self::Price => Dimension::Currency,
            Self::Gram | Self::Decagram | Self::Hectogram | Self::Kilogram => Dimension::Mass,
            Self::Milliliter | Self::Liter => Dimension::Volume,
        }
    }

    /// Size of this unit in the smallest unit of its dimension.
    #[must_use]
    pub fn factor(self) -> i64 {
        match self {
            Self::Piece | Self::Price | Self::Gram | Self::Milliliter => 1,
            Self::Decagram => 10,
            Self::Hectogram => 100,
            Self::Kilogram | Self::Liter => 1000,
        }
    }

    /// Whether quantities in this unit come from a scale.
    #[must_use]
    pub fn is_weight(self) -> bool {
        self.dimension() == Dimension::Mass
    }

    /// Whether quantities in this unit are measured rather than counted.
    #[must_use]
    pub fn is_measure(self) -> bool {
        matches!(self.dimension(), Dimension::Mass | Dimension::Volume)
    }
}

// =============================================================================
// CLUSTER C: CATALOG
// =============================================================================

/// How a product is sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Regular counted article.
    #[default]
    Article,
    /// Weighed by the shopper; the scale weight is entered manually.
    UserWeighed,
    /// Weighed in store; the barcode embeds the weight or price.
    PreWeighed,
    /// A bottle-return voucher redeemed at checkout.
    DepositReturnVoucher,
}

/// A product from the shop catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stock keeping unit, unique per shop.
    pub sku: String,
    /// Display name.
    pub name: String,
    /// How the product is sold.
    #[serde(default)]
    pub product_type: ProductType,
    /// Regular price per reference unit.
    pub list_price: Cents,
    /// Promotional price, if any.
    #[serde(default)]
    pub discounted_price: Option<Cents>,
    /// Price for loyalty-card holders, if any.
    #[serde(default)]
    pub customer_card_price: Option<Cents>,
    /// Unit the price refers to (e.g. per kilogram).
    #[serde(default)]
    pub reference_unit: Option<Unit>,
    /// Unit barcodes for this product embed.
    #[serde(default)]
    pub encoding_unit: Option<Unit>,
    /// Deposit product charged per unit (bottle deposit).
    #[serde(default)]
    pub deposit_product: Option<Box<Product>>,
    /// Product may no longer be sold.
    #[serde(default)]
    pub sale_stop: bool,
}

impl Product {
    /// Create an article with a fixed price.
    #[must_use]
    pub fn article(sku: impl Into<String>, name: impl Into<String>, list_price: Cents) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            product_type: ProductType::Article,
            list_price,
            discounted_price: None,
            customer_card_price: None,
            reference_unit: None,
            encoding_unit: None,
            deposit_product: None,
            sale_stop: false,
        }
    }

    /// Effective unit price.
    ///
    /// A customer card price wins when a card is present, then the
    /// discounted price, then the list price.
    #[must_use]
    pub fn price(&self, customer_card: bool) -> Cents {
        if customer_card {
            if let Some(price) = self.customer_card_price {
                return price;
            }
        }
        self.discounted_price.unwrap_or(self.list_price)
    }

    /// Price for `quantity` measured in `unit`.
    ///
    /// Measured quantities are converted to the reference unit and rounded
    /// with `rounding`. An embedded price is returned as is.
    #[must_use]
    pub fn price_for_quantity(
        &self,
        quantity: i64,
        unit: Option<Unit>,
        rounding: RoundingMode,
        customer_card: bool,
    ) -> Cents {
        let price = self.price(customer_card);
        match (unit, self.reference_unit) {
            (Some(Unit::Price), _) => quantity,
            (Some(from), Some(reference))
                if from.is_measure() && from.dimension() == reference.dimension() =>
            {
                let numerator = i128::from(price) * i128::from(quantity) * i128::from(from.factor());
                rounding.divide(numerator, i128::from(reference.factor()))
            }
            _ => price.saturating_mul(quantity),
        }
    }

    /// Whether this product is sold by weight.
    #[must_use]
    pub fn is_weighed(&self) -> bool {
        matches!(
            self.product_type,
            ProductType::UserWeighed | ProductType::PreWeighed
        )
    }

    /// Deposit charged per unit, 0 if the product carries none.
    #[must_use]
    pub fn deposit_price(&self, customer_card: bool) -> Cents {
        self.deposit_product
            .as_ref()
            .map_or(0, |deposit| deposit.price(customer_card))
    }
}

/// A scanned barcode, optionally carrying an embedded quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedCode {
    /// The code as scanned.
    pub code: String,
    /// Identifier of the code template that matched.
    pub template_id: String,
    /// Weight, price or piece count embedded in the code.
    #[serde(default)]
    pub embedded_data: Option<i64>,
    /// Unit of `embedded_data`.
    #[serde(default)]
    pub embedded_unit: Option<Unit>,
}

impl ScannedCode {
    /// A plain code without embedded data.
    #[must_use]
    pub fn plain(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            template_id: "default".into(),
            embedded_data: None,
            embedded_unit: None,
        }
    }

    /// A code carrying `data` in `unit`.
    #[must_use]
    pub fn embedded(code: impl Into<String>, data: i64, unit: Unit) -> Self {
        Self {
            code: code.into(),
            template_id: "embedded".into(),
            embedded_data: Some(data),
            embedded_unit: Some(unit),
        }
    }

    /// Whether the code carries a non-zero embedded value.
    #[must_use]
    pub fn has_embedded_data(&self) -> bool {
        self.embedded_data.is_some_and(|data| data != 0)
    }
}

/// Where a coupon comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponType {
    /// Chosen by the shopper in the app and attached to a product.
    Manual,
    /// Printed paper coupon, scanned like a product.
    Printed,
    /// Digital coupon activated on the loyalty account.
    Digital,
}

/// A coupon definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Coupon identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Origin of the coupon.
    pub coupon_type: CouponType,
    /// Redemption code, if any.
    #[serde(default)]
    pub code: Option<String>,
}
