//! # Cart State
//!
//! Ordered items plus the bookkeeping the reconciliation protocol relies on.
//!
//! ## Invariants
//!
//! - `modification_count` increases exactly when priced content changes;
//!   it never decreases, not even on clear.
//! - Every priced change regenerates `checkout_token` and drops the online
//!   total.
//! - After any insertion, coupon items come after all other items; relative
//!   order inside each group is preserved.

use serde::{Deserialize, Serialize};
use shared_types::{Cents, Product, Taxation, Timestamp, Violation, ViolationNotification};
use uuid::Uuid;

use super::errors::CartError;
use super::item::{CartItem, PriceContext, MAX_QUANTITY};

/// A structural copy of the cart, restorable for a limited time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartBackup {
    /// The saved state (never carries a backup itself).
    pub state: CartState,
    /// When the backup was taken.
    pub taken_at: Timestamp,
}

/// Result of inserting an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// Folded into the existing item at this position.
    Merged(usize),
    /// Inserted; the item now sits at this position.
    Inserted(usize),
    /// The equal item at this position is already at the quantity cap.
    Saturated(usize),
}

/// A limit crossed upward by the last check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitCrossing {
    /// The checkout limit.
    Checkout(Cents),
    /// The online payment limit.
    OnlinePayment(Cents),
}

/// Effect of resolving backend violations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationResolution {
    /// Removed coupon items with the position they had.
    pub removed: Vec<(usize, CartItem)>,
    /// Notifications that were not recorded before.
    pub new_notifications: Vec<ViolationNotification>,
}

/// The cart of one shopping session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    /// Stable until the cart is invalidated.
    pub session_id: String,
    /// Regenerated on every priced change.
    pub checkout_token: String,
    /// Shop the cart belongs to.
    #[serde(default)]
    pub shop_id: Option<String>,
    /// Ordered items, coupons last.
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Optimistic concurrency token.
    #[serde(default)]
    pub modification_count: u64,
    /// Insertions over the cart's lifetime.
    #[serde(default)]
    pub addition_count: u64,
    /// Authoritative backend total.
    #[serde(default)]
    pub online_total_price: Option<Cents>,
    /// Products the backend refused to sell.
    #[serde(default)]
    pub invalid_products: Option<Vec<Product>>,
    /// The backend refused the deposit return voucher.
    #[serde(default)]
    pub invalid_deposit_return_voucher: bool,
    /// Unacknowledged violation notices.
    #[serde(default)]
    pub violation_notifications: Vec<ViolationNotification>,
    /// Latched while the total is at or above the checkout limit.
    #[serde(default)]
    pub checkout_limit_reached: bool,
    /// Latched while the total is at or above the online payment limit.
    #[serde(default)]
    pub online_payment_limit_reached: bool,
    /// Tax treatment.
    #[serde(default)]
    pub taxation: Taxation,
    /// Last mutation in milliseconds.
    #[serde(default)]
    pub last_modified: Timestamp,
    /// Restorable copy taken before a destructive action.
    #[serde(default)]
    pub backup: Option<Box<CartBackup>>,
}

impl CartState {
    /// An empty cart with a fresh session.
    pub fn new(shop_id: Option<String>, now: Timestamp) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            checkout_token: Uuid::new_v4().to_string(),
            shop_id,
            items: Vec::new(),
            modification_count: 0,
            addition_count: 0,
            online_total_price: None,
            invalid_products: None,
            invalid_deposit_return_voucher: false,
            violation_notifications: Vec::new(),
            checkout_limit_reached: false,
            online_payment_limit_reached: false,
            taxation: Taxation::Unspecified,
            last_modified: now,
            backup: None,
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Record a priced change.
    pub fn touch(&mut self, now: Timestamp) {
        self.modification_count += 1;
        self.checkout_token = Uuid::new_v4().to_string();
        self.last_modified = now;
    }

    fn check_index(&self, index: usize) -> Result<(), CartError> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(CartError::IndexOutOfBounds {
                index,
                len: self.items.len(),
            })
        }
    }

    /// Position of the item with `id`.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Merge `item` into an existing mergeable item with the same SKU, or
    /// insert it at `index` (clamped) and restore coupon ordering.
    ///
    /// Does not touch counters other than `addition_count`.
    pub fn insert(&mut self, item: CartItem, index: usize, ctx: PriceContext) -> Insertion {
        if item.is_mergeable(ctx) {
            let existing = self.items.iter().position(|candidate| {
                candidate.is_mergeable(ctx) && candidate.sku().is_some() && candidate.sku() == item.sku()
            });
            if let Some(position) = existing {
                let target = &mut self.items[position];
                let summed = (target.quantity() + item.quantity()).min(MAX_QUANTITY);
                if summed == target.quantity() || target.set_quantity(summed).is_err() {
                    return Insertion::Saturated(position);
                }
                return Insertion::Merged(position);
            }
        }

        let id = item.id.clone();
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        self.addition_count += 1;
        self.sort_coupons_last();
        Insertion::Inserted(self.index_of(&id).unwrap_or(index))
    }

    /// Stable partition: coupons after everything else.
    pub fn sort_coupons_last(&mut self) {
        self.items.sort_by_key(CartItem::is_coupon);
    }

    /// Remove the item at `index`.
    pub fn remove(&mut self, index: usize) -> Result<CartItem, CartError> {
        self.check_index(index)?;
        Ok(self.items.remove(index))
    }

    /// Mutable access to the item at `index`.
    pub fn item_mut(&mut self, index: usize) -> Result<&mut CartItem, CartError> {
        self.check_index(index)?;
        Ok(&mut self.items[index])
    }

    /// Drop everything the backend contributed.
    ///
    /// Backend-only lines are removed, attached line items detached and
    /// manual coupon confirmations reset. Backend coupon ids survive.
    pub fn invalidate_online_prices(&mut self) {
        self.online_total_price = None;
        self.invalid_products = None;
        self.invalid_deposit_return_voucher = false;
        self.items.retain(|item| !item.is_backend_line());
        for item in &mut self.items {
            item.line_item = None;
            item.manual_coupon_applied = false;
        }
    }

    /// Remove coupons the backend rejected and record notices.
    ///
    /// Each removal is a priced change. A notice is recorded once per
    /// `refers_to`.
    pub fn resolve_violations(
        &mut self,
        violations: &[Violation],
        now: Timestamp,
    ) -> ViolationResolution {
        let mut resolution = ViolationResolution::default();

        for violation in violations {
            let mut name = None;
            let mut index = 0;
            while index < self.items.len() {
                let item = &self.items[index];
                if item.is_coupon() && item.backend_coupon_key() == Some(violation.refers_to.as_str())
                {
                    let removed = self.items.remove(index);
                    name = Some(removed.name().to_string());
                    self.touch(now);
                    resolution.removed.push((index, removed));
                } else {
                    index += 1;
                }
            }

            let known = self
                .violation_notifications
                .iter()
                .any(|notice| notice.refers_to == violation.refers_to);
            if !known {
                let notice = ViolationNotification::from_violation(violation, name);
                self.violation_notifications.push(notice.clone());
                resolution.new_notifications.push(notice);
            }
        }

        resolution
    }

    /// Drop acknowledged notices.
    pub fn remove_violation_notifications(&mut self, refers_to: &[String]) -> usize {
        let before = self.violation_notifications.len();
        self.violation_notifications
            .retain(|notice| !refers_to.contains(&notice.refers_to));
        before - self.violation_notifications.len()
    }

    /// Empty the cart. Counters keep increasing.
    pub fn clear(&mut self, now: Timestamp) {
        self.items.clear();
        self.backup = None;
        self.violation_notifications.clear();
        self.invalidate_online_prices();
        self.touch(now);
    }

    /// Sum of backend deposit lines.
    pub fn backend_deposit_price(&self) -> Cents {
        self.items
            .iter()
            .filter(|item| item.is_deposit_line())
            .map(|item| item.total_price(PriceContext::default()))
            .sum()
    }

    /// Sum of locally derived deposits.
    pub fn local_deposit_price(&self, ctx: PriceContext) -> Cents {
        self.items.iter().map(|item| item.deposit_price(ctx)).sum()
    }

    /// Deposit total: the larger of the backend and the local view.
    pub fn total_deposit_price(&self, ctx: PriceContext) -> Cents {
        self.backend_deposit_price()
            .max(self.local_deposit_price(ctx))
    }

    /// Cart total: the online total when present, else the local sum.
    pub fn total_price(&self, ctx: PriceContext) -> Cents {
        if let Some(online) = self.online_total_price {
            return online;
        }
        let lines: Cents = self
            .items
            .iter()
            .filter(|item| !item.is_deposit_line())
            .map(|item| item.total_price(ctx))
            .sum();
        lines + self.total_deposit_price(ctx)
    }

    /// Number of articles for display.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(CartItem::counted_quantity).sum()
    }

    /// Recompute limit latches.
    ///
    /// Each limit is edge-triggered on its own: crossing upward latches it
    /// and is reported once, falling below releases it silently. A limit of
    /// 0 is disabled.
    pub fn update_limits(
        &mut self,
        checkout_limit: Cents,
        online_payment_limit: Cents,
        ctx: PriceContext,
    ) -> Vec<LimitCrossing> {
        let total = self.total_price(ctx);
        let mut crossings = Vec::new();

        if checkout_limit > 0 && total >= checkout_limit {
            if !self.checkout_limit_reached {
                self.checkout_limit_reached = true;
                crossings.push(LimitCrossing::Checkout(total));
            }
        } else {
            self.checkout_limit_reached = false;
        }

        if online_payment_limit > 0 && total >= online_payment_limit {
            if !self.online_payment_limit_reached {
                self.online_payment_limit_reached = true;
                crossings.push(LimitCrossing::OnlinePayment(total));
            }
        } else {
            self.online_payment_limit_reached = false;
        }

        crossings
    }

    /// Take a backup unless the cart is empty.
    pub fn take_backup(&mut self, now: Timestamp) -> bool {
        if self.items.is_empty() {
            return false;
        }
        let mut copy = self.clone();
        copy.backup = None;
        self.backup = Some(Box::new(CartBackup {
            state: copy,
            taken_at: now,
        }));
        true
    }

    /// Whether a backup exists and is younger than `ttl_ms`.
    pub fn is_restorable(&self, now: Timestamp, ttl_ms: u64) -> bool {
        self.backup
            .as_ref()
            .is_some_and(|backup| now.saturating_sub(backup.taken_at) < ttl_ms)
    }

    /// Replace this state with `next`, keeping counters monotonic.
    ///
    /// `next.last_modified` is kept so the age of a loaded cart survives.
    pub fn replace_with(&mut self, mut next: CartState) {
        next.modification_count = next.modification_count.max(self.modification_count + 1);
        next.addition_count = next.addition_count.max(self.addition_count);
        next.checkout_token = Uuid::new_v4().to_string();
        *self = next;
    }
}
