//! # Scan & Go Cart Runtime
//!
//! Runs a scripted shopping session against an in-process checkout backend
//! and a file store, logging what the cart does.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `SG_*` environment variables
//! 2. Initialize logging and metrics
//! 3. Build and start the container (load saved cart, attach coordinator)
//! 4. Scan a few products while logging cart events, wait for reconciliation
//! 5. Flush the cart and exit

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cart_runtime::{CartContainer, Collaborators, RuntimeConfig};
use scango_telemetry::{encode_metrics, init_telemetry};
use sg_01_shopping_cart::adapters::{MockCheckoutApi, MockProductLookup};
use sg_01_shopping_cart::CartItem;
use sg_02_cart_storage::FileCartStore;
use shared_bus::EventFilter;
use shared_types::{LineItem, LineItemType, Product, ScannedCode, Unit};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

fn demo_catalog() -> Vec<(Product, ScannedCode)> {
    let mut water = Product::article("water-6", "Still Water 6x1.5l", 299);
    water.deposit_product = Some(Box::new(Product::article("deposit-25", "Deposit", 150)));
    let cheese = Product {
        product_type: shared_types::ProductType::PreWeighed,
        reference_unit: Some(Unit::Kilogram),
        encoding_unit: Some(Unit::Gram),
        ..Product::article("gouda", "Gouda", 1_290)
    };
    vec![
        (Product::article("milk", "Whole Milk 1l", 129), ScannedCode::plain("4000001")),
        (water, ScannedCode::plain("4000002")),
        (cheese, ScannedCode::embedded("2812345", 345, Unit::Gram)),
        (Product::article("milk", "Whole Milk 1l", 129), ScannedCode::plain("4000001")),
    ]
}

fn demo_backend(catalog: &[(Product, ScannedCode)]) -> MockCheckoutApi {
    let api = MockCheckoutApi::new();
    for (product, _) in catalog {
        api.set_price(product.sku.clone(), product.price(false));
    }
    let mut discount = LineItem::new("basket-discount", LineItemType::Discount, -50);
    discount.name = "Basket discount".to_string();
    api.add_line(discount);
    api
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = RuntimeConfig::from_env();
    if config.shop_id.is_none() {
        config.shop_id = Some("demo-shop".to_string());
    }
    init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;
    config.validate().context("Invalid configuration")?;

    let catalog = demo_catalog();
    let api = Arc::new(demo_backend(&catalog));
    let store = Arc::new(FileCartStore::new(&config.storage.root_dir));
    let debounce = config.cart.debounce_delay();

    let container = CartContainer::new(
        config,
        Collaborators {
            checkout_api: api.clone(),
            product_lookup: Arc::new(MockProductLookup::new()),
            store,
            clock: None,
        },
    );
    let mut events = container.bus.event_stream(EventFilter::all());
    let observer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            debug!(event = event.name(), ?event, "Cart event");
        }
    });

    container.start().await?;

    for (product, code) in catalog {
        info!(sku = %product.sku, "Scanning product");
        container.cart.add(CartItem::product(product, code));
    }

    tokio::time::sleep(debounce + Duration::from_millis(250)).await;

    match container.updater.last_outcome() {
        Some(outcome) => info!(?outcome, "Last reconciliation"),
        None => warn!("No reconciliation has run yet"),
    }
    info!(
        items = container.cart.len(),
        quantity = container.cart.total_quantity(),
        total = container.cart.total_price(),
        deposit = container.cart.total_deposit_price(),
        verified = container.updater.is_verified(),
        backend_calls = api.call_count(),
        "Cart summary"
    );

    container.shutdown().await?;
    observer.abort();

    if let Ok(metrics) = encode_metrics() {
        info!("Metrics:\n{}", metrics);
    }
    Ok(())
}
