//! # Persistence Flows
//!
//! Saved carts across runtime restarts, shop switches and stale files,
//! using the file store in a temporary directory.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cart_runtime::{CartContainer, Collaborators, RuntimeConfig};
    use shared_types::{Product, ScannedCode};
    use sg_01_shopping_cart::adapters::{MockCheckoutApi, MockProductLookup, MockTimeSource};
    use sg_01_shopping_cart::CartItem;
    use sg_02_cart_storage::{Environment, FileCartStore, FreshReason, LoadOutcome, StorageKey};
    use tempfile::TempDir;

    use crate::integration::eventually;

    const START: u64 = 1_700_000_000_000;

    fn article(sku: &str) -> CartItem {
        CartItem::product(Product::article(sku, sku, 100), ScannedCode::plain(sku))
    }

    fn key(shop: &str) -> StorageKey {
        StorageKey::new(Environment::Testing, shop)
    }

    struct Harness {
        dir: TempDir,
        clock: Arc<MockTimeSource>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                dir: TempDir::new().expect("tempdir"),
                clock: Arc::new(MockTimeSource::new(START)),
            }
        }

        fn config(&self) -> RuntimeConfig {
            let mut config = RuntimeConfig::for_testing();
            config.storage.root_dir = self.dir.path().to_path_buf();
            config
        }

        fn store(&self) -> FileCartStore {
            FileCartStore::new(self.dir.path())
        }

        fn container(&self, api: Arc<MockCheckoutApi>) -> CartContainer {
            CartContainer::new(
                self.config(),
                Collaborators {
                    checkout_api: api,
                    product_lookup: Arc::new(MockProductLookup::new()),
                    store: Arc::new(self.store()),
                    clock: Some(self.clock.clone()),
                },
            )
        }
    }

    #[tokio::test]
    async fn test_cart_survives_restart() {
        let h = Harness::new();
        let first = h.container(Arc::new(MockCheckoutApi::new()));
        assert_eq!(
            first.start().await.expect("start"),
            Some(LoadOutcome::Fresh(FreshReason::Missing))
        );
        first.cart.add(article("a"));
        first.cart.add(article("b"));
        let session = first.cart.session_id();
        first.shutdown().await.expect("shutdown");
        assert!(h.store().path_for(&key("test-shop")).exists());

        let api = Arc::new(MockCheckoutApi::new());
        api.set_price("a", 100);
        api.set_price("b", 100);
        let second = h.container(api.clone());
        assert_eq!(
            second.start().await.expect("start"),
            Some(LoadOutcome::Resumed { items: 2 })
        );
        assert_eq!(second.cart.session_id(), session);
        assert_eq!(second.cart.get(1).and_then(|i| i.sku().map(str::to_string)), Some("b".into()));

        // A resumed cart is reconciled right away.
        assert!(eventually(|| second.updater.is_verified()).await);
        assert_eq!(api.call_count(), 1);
        second.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_expired_cart_starts_new_session() {
        let h = Harness::new();
        let first = h.container(Arc::new(MockCheckoutApi::new()));
        first.start().await.expect("start");
        first.cart.add(article("a"));
        let session = first.cart.session_id();
        first.shutdown().await.expect("shutdown");

        h.clock.advance(h.config().storage.max_cart_age_ms + 1);

        let api = Arc::new(MockCheckoutApi::new());
        let second = h.container(api.clone());
        assert_eq!(second.start().await.expect("start"), Some(LoadOutcome::Expired));
        assert!(second.cart.is_empty());
        assert_ne!(second.cart.session_id(), session);
        assert_eq!(second.cart.shop_id().as_deref(), Some("test-shop"));
        assert_eq!(api.call_count(), 0);
        second.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_malformed_file_starts_fresh() {
        let h = Harness::new();
        let path = h.store().path_for(&key("test-shop"));
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, b"{ not a cart").expect("write");

        let container = h.container(Arc::new(MockCheckoutApi::new()));
        assert_eq!(
            container.start().await.expect("start"),
            Some(LoadOutcome::Fresh(FreshReason::Malformed))
        );
        assert!(container.cart.is_empty());

        container.cart.add(article("a"));
        container.shutdown().await.expect("shutdown");
        let saved = std::fs::read_to_string(&path).expect("read");
        assert!(saved.contains("\"a\""));
    }

    #[tokio::test]
    async fn test_shop_switch_keeps_carts_apart() {
        let h = Harness::new();
        let container = h.container(Arc::new(MockCheckoutApi::new()));
        container.start().await.expect("start");
        let persistence = container.persistence.as_ref().expect("shop configured");

        container.cart.add(article("a"));
        assert_eq!(
            persistence.switch_shop("other-shop").await,
            LoadOutcome::Fresh(FreshReason::Missing)
        );
        assert!(container.cart.is_empty());
        assert_eq!(container.cart.shop_id().as_deref(), Some("other-shop"));

        container.cart.add(article("b"));
        container.cart.add(article("c"));
        assert_eq!(
            persistence.switch_shop("test-shop").await,
            LoadOutcome::Resumed { items: 1 }
        );
        assert_eq!(container.cart.get(0).and_then(|i| i.sku().map(str::to_string)), Some("a".into()));
        assert!(h.store().path_for(&key("other-shop")).exists());

        container.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_changes_are_saved_without_shutdown() {
        let h = Harness::new();
        let container = h.container(Arc::new(MockCheckoutApi::new()));
        container.start().await.expect("start");
        let path = h.store().path_for(&key("test-shop"));

        container.cart.add(article("saved-sku"));
        assert!(
            eventually(|| {
                std::fs::read_to_string(&path)
                    .map(|saved| saved.contains("saved-sku"))
                    .unwrap_or(false)
            })
            .await
        );
        container.shutdown().await.expect("shutdown");
    }
}
