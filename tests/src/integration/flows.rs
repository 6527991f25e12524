//! # Integration Test Flows
//!
//! Tests that the cart engine, the reconciliation coordinator and the
//! runtime container work together through the shared bus.
//!
//! ## Flows Tested:
//!
//! 1. **Scan → Coordinator**: mutations schedule reconciliation, bursts coalesce
//! 2. **Coordinator → Cart**: answers for outdated carts are dropped
//! 3. **Cart → Subscribers**: limit and violation events reach bus listeners

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cart_runtime::{CartContainer, Collaborators, RuntimeConfig};
    use shared_bus::{CartEvent, EventFilter, EventTopic, InMemoryEventBus, Subscription};
    use shared_types::{Cents, Coupon, CouponType, Product, ScannedCode, Violation, ViolationType};
    use sg_01_shopping_cart::adapters::{MockCheckoutApi, MockProductLookup, MockTimeSource};
    use sg_01_shopping_cart::{
        CartConfig, CartItem, CartUpdater, ReconcileOutcome, ShoppingCart, SkipReason, UpdatePhase,
    };
    use sg_02_cart_storage::{FreshReason, InMemoryCartStore, LoadOutcome};

    use crate::integration::eventually;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn article(sku: &str, price: Cents) -> CartItem {
        CartItem::product(
            Product::article(sku, sku.to_uppercase(), price),
            ScannedCode::plain(format!("400{sku}")),
        )
    }

    fn coupon(id: &str) -> CartItem {
        CartItem::coupon(
            Coupon {
                id: id.into(),
                name: "Ten off".into(),
                coupon_type: CouponType::Printed,
                code: None,
            },
            None,
        )
    }

    fn drain(events: &mut Subscription) -> Vec<CartEvent> {
        let mut out = Vec::new();
        while let Ok(Some(event)) = events.try_recv() {
            out.push(event);
        }
        out
    }

    fn container_with(config: RuntimeConfig, api: Arc<MockCheckoutApi>) -> CartContainer {
        CartContainer::new(
            config,
            Collaborators {
                checkout_api: api,
                product_lookup: Arc::new(MockProductLookup::new()),
                store: Arc::new(InMemoryCartStore::new()),
                clock: None,
            },
        )
    }

    /// Cart and coordinator without a container, so nothing runs on its own.
    struct Standalone {
        cart: ShoppingCart,
        api: Arc<MockCheckoutApi>,
        updater: CartUpdater,
        events: Subscription,
    }

    fn standalone(api: MockCheckoutApi) -> Standalone {
        let bus = Arc::new(InMemoryEventBus::new());
        let events = bus.subscribe(EventFilter::all());
        let cart = ShoppingCart::new(
            CartConfig::for_testing(),
            Some("test-shop".into()),
            bus,
            Arc::new(MockTimeSource::new(10_000)),
        );
        let api = Arc::new(api);
        let updater = CartUpdater::new(cart.clone(), api.clone(), Arc::new(MockProductLookup::new()));
        Standalone {
            cart,
            api,
            updater,
            events,
        }
    }

    // =============================================================================
    // SCANNING AND RECONCILIATION
    // =============================================================================

    #[tokio::test]
    async fn test_scan_twice_then_remove_skips_backend() {
        let api = Arc::new(MockCheckoutApi::new());
        let container = container_with(RuntimeConfig::for_testing(), api.clone());
        let mut events = container.bus.subscribe(EventFilter::topics(vec![EventTopic::Items]));

        let outcome = container.start().await.expect("start");
        assert_eq!(outcome, Some(LoadOutcome::Fresh(FreshReason::Missing)));

        container.cart.add(article("a", 100));
        container.cart.add(article("a", 100));
        assert_eq!(container.cart.len(), 1);
        assert_eq!(container.cart.total_quantity(), 2);

        container.cart.remove(0).expect("remove");
        assert!(
            eventually(|| {
                container.updater.last_outcome()
                    == Some(ReconcileOutcome::Skipped(SkipReason::EmptyCart))
            })
            .await
        );
        assert_eq!(api.call_count(), 0);
        assert!(container.updater.payment_methods().is_none());

        let events = drain(&mut events);
        assert!(matches!(events[0], CartEvent::ItemAdded { index: 0, .. }));
        assert!(matches!(events[1], CartEvent::QuantityChanged { index: 0, .. }));
        assert!(matches!(events[2], CartEvent::ItemRemoved { index: 0, .. }));

        container.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_burst_of_scans_is_reconciled_once() {
        let api = Arc::new(MockCheckoutApi::new());
        api.set_price("a", 100);
        api.set_price("b", 200);
        api.set_price("c", 300);
        let container = container_with(RuntimeConfig::for_testing(), api.clone());
        container.start().await.expect("start");

        container.cart.add(article("a", 100));
        container.cart.add(article("b", 200));
        container.cart.add(article("c", 300));

        assert!(eventually(|| container.updater.is_verified()).await);
        assert_eq!(api.call_count(), 1);
        assert_eq!(api.requests()[0].items.len(), 3);
        assert_eq!(
            container.updater.last_outcome(),
            Some(ReconcileOutcome::Applied { token: 3, total: 600 })
        );
        assert_eq!(container.cart.online_total_price(), Some(600));
        assert_eq!(container.cart.total_price(), 600);

        container.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_answer_for_outdated_cart_is_discarded() {
        let f = standalone(MockCheckoutApi::gated());
        f.api.set_price("a", 100);
        f.api.set_price("b", 200);
        f.cart.add(article("a", 100));

        let updater = f.updater.clone();
        let in_flight = tokio::spawn(async move { updater.update(true).await });
        assert!(eventually(|| f.api.call_count() == 1).await);
        assert_eq!(f.updater.phase(), UpdatePhase::RequestInFlight { token: 1 });

        f.cart.add(article("b", 200));
        f.api.release(1);
        let outcome = in_flight.await.expect("join");
        assert_eq!(outcome, ReconcileOutcome::Discarded { sent: 1, current: 2 });
        assert_eq!(f.cart.online_total_price(), None);
        assert!(!f.updater.is_verified());

        f.api.release(1);
        assert_eq!(
            f.updater.update(false).await,
            ReconcileOutcome::Applied { token: 2, total: 300 }
        );
        assert_eq!(f.updater.phase(), UpdatePhase::Idle);
    }

    #[tokio::test]
    async fn test_rejected_coupon_reaches_subscribers() {
        let mut f = standalone(MockCheckoutApi::new());
        f.api.set_price("a", 100);
        f.api.add_violation(Violation {
            kind: ViolationType::CouponInvalid,
            refers_to: "c1".into(),
            message: "Unknown coupon".into(),
        });
        f.cart.add(article("a", 100));
        f.cart.add(coupon("c1"));
        drain(&mut f.events);

        assert!(matches!(f.updater.update(true).await, ReconcileOutcome::Applied { .. }));
        assert_eq!(f.cart.len(), 1);
        assert!(f.cart.items().iter().all(CartItem::is_product));

        let notices = drain(&mut f.events)
            .into_iter()
            .find_map(|event| match event {
                CartEvent::ViolationDetected(notices) => Some(notices),
                _ => None,
            })
            .expect("violation event");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].refers_to, "c1");
        assert_eq!(notices[0].kind, ViolationType::CouponInvalid);

        let removed = f.cart.remove_violation_notifications(&["c1".to_string()]);
        assert_eq!(removed, 1);
        assert!(f.cart.violation_notifications().is_empty());
    }

    #[tokio::test]
    async fn test_limit_events_fire_once_per_crossing() {
        let mut config = RuntimeConfig::for_testing();
        config.cart.max_online_payment_limit = 250;
        config.cart.max_checkout_limit = 1_000;
        config.validate().expect("valid limits");

        let api = Arc::new(MockCheckoutApi::new());
        for (sku, price) in [("a", 100), ("b", 200), ("c", 100), ("d", 700)] {
            api.set_price(sku, price);
        }
        let container = container_with(config, api);
        let mut limits = container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Limits]));
        container.start().await.expect("start");

        container.cart.add(article("a", 100));
        assert!(drain(&mut limits).is_empty());

        container.cart.add(article("b", 200));
        container.cart.add(article("c", 100));
        assert_eq!(
            drain(&mut limits),
            vec![CartEvent::OnlinePaymentLimitReached { total: 300 }]
        );

        container.cart.add(article("d", 700));
        assert_eq!(
            drain(&mut limits),
            vec![CartEvent::CheckoutLimitReached { total: 1_100 }]
        );

        container.shutdown().await.expect("shutdown");
    }
}
