//! # Cart Benchmarks
//!
//! | Operation | Target |
//! |-----------|--------|
//! | Scan into a 100-line cart (merge or append) | < 50µs |
//! | Total price of a 100-line cart | < 20µs |
//! | Backend cart for a 100-line cart | < 100µs |
//! | Encode a 100-line cart for storage | < 500µs |

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sg_01_shopping_cart::{CartConfig, CartItem, ShoppingCart, SystemTimeSource};
use shared_bus::NoOpPublisher;
use shared_types::{Product, ScannedCode};

fn article(n: usize) -> CartItem {
    let sku = format!("sku-{n}");
    CartItem::product(
        Product::article(sku.clone(), sku.clone(), 100 + n as i64),
        ScannedCode::plain(sku),
    )
}

fn filled_cart(lines: usize) -> ShoppingCart {
    let cart = ShoppingCart::new(
        CartConfig::default(),
        Some("bench-shop".into()),
        Arc::new(NoOpPublisher),
        Arc::new(SystemTimeSource),
    );
    for n in 0..lines {
        cart.add(article(n));
    }
    cart
}

fn bench_scanning(c: &mut Criterion) {
    let mut group = c.benchmark_group("sg-01-scanning");

    for lines in [10, 100, 500] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("merge_scan", lines), &lines, |b, &lines| {
            let cart = filled_cart(lines);
            b.iter(|| black_box(cart.add(article(lines / 2))))
        });
        group.bench_with_input(BenchmarkId::new("append_scan", lines), &lines, |b, &lines| {
            b.iter_batched(
                || filled_cart(lines),
                |cart| black_box(cart.add(article(lines + 1))),
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("sg-01-views");
    let cart = filled_cart(100);

    group.bench_function("total_price_100", |b| b.iter(|| black_box(cart.total_price())));
    group.bench_function("backend_cart_100", |b| {
        b.iter(|| black_box(cart.to_backend_cart()))
    });
    group.finish();
}

fn bench_storage_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("sg-02-encoding");
    let state = filled_cart(100).snapshot();

    group.bench_function("encode_100", |b| {
        b.iter(|| black_box(serde_json::to_vec(&state).map(|bytes| bytes.len())))
    });
    let bytes = serde_json::to_vec(&state).unwrap_or_default();
    group.bench_function("decode_100", |b| {
        b.iter(|| {
            black_box(serde_json::from_slice::<sg_01_shopping_cart::CartState>(&bytes).is_ok())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_scanning, bench_views, bench_storage_encoding);
criterion_main!(benches);
