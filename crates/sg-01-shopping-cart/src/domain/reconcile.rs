//! # Reconciliation Apply
//!
//! Folds a backend `CheckoutInfo` into a `CartState`. Pure: the caller
//! decides whether the response is still current and publishes events.
//!
//! ## Order of Operations
//!
//! 1. Desync check (no mutation on failure)
//! 2. Drop previous online prices
//! 3. Resolve violations
//! 4. Attach line items, substituting products whose SKU changed
//! 5. Confirm manual coupons
//! 6. Insert backend-only lines, aggregating cart discounts
//! 7. Commit the online total

use std::collections::{HashMap, HashSet};

use shared_types::{Cents, CheckoutInfo, LineItem, LineItemType, Product, Timestamp};
use uuid::Uuid;

use super::errors::ReconcileError;
use super::item::{CartItem, ItemPayload};
use super::state::{CartState, ViolationResolution};

/// Name of the synthetic line replacing grouped cart discounts.
pub const CART_DISCOUNT_NAME: &str = "Cart discount";

/// What applying a checkout info changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Violation handling.
    pub violations: ViolationResolution,
    /// At least one product was replaced by the backend's version.
    pub products_updated: bool,
    /// Backend-only lines inserted.
    pub backend_lines: usize,
    /// Committed online total.
    pub total: Cents,
}

/// SKUs the backend priced differently from the local product items.
pub fn substituted_skus(state: &CartState, line_items: &[LineItem]) -> Vec<String> {
    let by_id: HashMap<&str, &LineItem> = line_items
        .iter()
        .map(|line| (line.id.as_str(), line))
        .collect();

    let mut skus: Vec<String> = Vec::new();
    for item in &state.items {
        let (Some(local_sku), Some(line)) = (
            item.product_ref().map(|p| p.sku.as_str()),
            by_id.get(item.id.as_str()),
        ) else {
            continue;
        };
        if let Some(sku) = line.sku.as_deref() {
            if sku != local_sku && !skus.iter().any(|known| known == sku) {
                skus.push(sku.to_string());
            }
        }
    }
    skus
}

/// Local items the backend did not price.
///
/// Coupons and backend-only lines are exempt.
pub fn missing_line_items(state: &CartState, line_items: &[LineItem]) -> Vec<String> {
    let ids: HashSet<&str> = line_items.iter().map(|line| line.id.as_str()).collect();
    state
        .items
        .iter()
        .filter(|item| item.is_product() && !ids.contains(item.id.as_str()))
        .map(|item| item.id.clone())
        .collect()
}

/// Merge cart-level discounts sharing a `discount_type` into one line.
fn aggregate_cart_discounts(lines: Vec<LineItem>) -> Vec<LineItem> {
    let mut groups: Vec<(Option<String>, Vec<LineItem>)> = Vec::new();
    let mut others = Vec::new();

    for line in lines {
        if line.kind == LineItemType::Discount && line.refers_to.is_none() {
            match groups.iter().position(|(key, _)| *key == line.discount_type) {
                Some(index) => groups[index].1.push(line),
                None => groups.push((line.discount_type.clone(), vec![line])),
            }
        } else {
            others.push(line);
        }
    }

    for (discount_type, mut group) in groups {
        if group.len() == 1 {
            others.extend(group.pop());
            continue;
        }
        let total: Cents = group.iter().map(|line| line.total_price).sum();
        let mut merged = LineItem::new(Uuid::new_v4().to_string(), LineItemType::Discount, total);
        merged.name = CART_DISCOUNT_NAME.to_string();
        merged.discount_type = discount_type;
        others.push(merged);
    }

    others
}

/// Apply `info` to `state`.
///
/// `substitutions` maps SKUs to the products the backend priced instead.
/// On desync the state is left untouched.
pub fn apply_checkout_info(
    state: &mut CartState,
    info: &CheckoutInfo,
    substitutions: &HashMap<String, Product>,
    display_net_price: bool,
    now: Timestamp,
) -> Result<ApplySummary, ReconcileError> {
    let missing = missing_line_items(state, &info.line_items);
    if !missing.is_empty() {
        return Err(ReconcileError::Desync { missing });
    }

    state.invalidate_online_prices();

    let mut summary = ApplySummary {
        violations: state.resolve_violations(&info.violations, now),
        ..ApplySummary::default()
    };

    // Lines of coupons removed for a violation are not reinserted.
    let removed: HashSet<String> = summary
        .violations
        .removed
        .iter()
        .map(|(_, item)| item.id.clone())
        .collect();
    let mut backend_only = Vec::new();

    for line in &info.line_items {
        if let Some(index) = state.index_of(&line.id) {
            let item = &mut state.items[index];
            attach_line_item(item, line, substitutions, &mut summary.products_updated);
            continue;
        }

        if line.kind == LineItemType::Coupon {
            if let Some(target) = line.refers_to.as_deref().and_then(|id| state.index_of(id)) {
                let item = &mut state.items[target];
                if item.manual_coupon.is_some() {
                    item.manual_coupon_applied = true;
                }
            }
        }

        if !removed.contains(&line.id) {
            backend_only.push(line.clone());
        }
    }

    for line in aggregate_cart_discounts(backend_only) {
        state.items.push(CartItem::from_line_item(line));
        summary.backend_lines += 1;
    }

    let total = if display_net_price {
        info.price.net_price
    } else {
        info.price.price
    };
    state.online_total_price = Some(total);
    summary.total = total;

    Ok(summary)
}

fn attach_line_item(
    item: &mut CartItem,
    line: &LineItem,
    substitutions: &HashMap<String, Product>,
    products_updated: &mut bool,
) {
    match &mut item.payload {
        ItemPayload::Product { product, .. } => {
            if let Some(sku) = line.sku.as_deref() {
                if sku != product.sku {
                    if let Some(replacement) = substitutions.get(sku) {
                        *product = replacement.clone();
                        *products_updated = true;
                    }
                }
            }
        }
        ItemPayload::Coupon { .. } => {
            if line.coupon_id.is_some() {
                item.backend_coupon_id = line.coupon_id.clone();
            }
        }
        ItemPayload::LineItem { .. } => return,
    }
    item.line_item = Some(line.clone());
}
