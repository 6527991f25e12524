//! Prometheus metrics for the cart subsystems.
//!
//! All metrics follow the naming convention: `sg_<subsystem>_<metric>_<unit>`
//!
//! Counters work before registration; registration only makes them visible
//! to [`encode_metrics`].

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // CART METRICS (Subsystem 1)
    // =========================================================================

    /// Priced cart mutations by operation
    pub static ref CART_MUTATIONS: CounterVec = CounterVec::new(
        Opts::new("sg_cart_mutations_total", "Cart mutations that changed priced content"),
        &["operation"]  // insert, merge, remove, quantity, coupon, clear, restore, violation
    ).expect("metric creation failed");

    /// Items currently in the cart
    pub static ref CART_ITEMS: Gauge = Gauge::new(
        "sg_cart_items",
        "Number of items in the active cart"
    ).expect("metric creation failed");

    /// Reconciliation requests sent to the checkout backend
    pub static ref RECONCILE_REQUESTS: Counter = Counter::new(
        "sg_cart_reconcile_requests_total",
        "Checkout info requests sent to the backend"
    ).expect("metric creation failed");

    /// Reconciliation outcomes
    pub static ref RECONCILE_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("sg_cart_reconcile_outcomes_total", "Reconciliation outcomes"),
        &["outcome"]  // applied, discarded, errored, skipped
    ).expect("metric creation failed");

    /// Backend round trip duration
    pub static ref RECONCILE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "sg_cart_reconcile_duration_seconds",
            "Time spent waiting for the checkout backend"
        ).buckets(exponential_buckets(0.01, 2.0, 12).unwrap_or_default())
    ).expect("metric creation failed");

    // =========================================================================
    // STORAGE METRICS (Subsystem 2)
    // =========================================================================

    /// Cart writes by result
    pub static ref STORAGE_WRITES: CounterVec = CounterVec::new(
        Opts::new("sg_storage_writes_total", "Cart snapshots written"),
        &["result"]  // ok, error
    ).expect("metric creation failed");

    /// Cart loads by outcome
    pub static ref STORAGE_LOADS: CounterVec = CounterVec::new(
        Opts::new("sg_storage_loads_total", "Cart loads"),
        &["outcome"]  // resumed, fresh, expired
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Cart
        Box::new(CART_MUTATIONS.clone()),
        Box::new(CART_ITEMS.clone()),
        Box::new(RECONCILE_REQUESTS.clone()),
        Box::new(RECONCILE_OUTCOMES.clone()),
        Box::new(RECONCILE_DURATION.clone()),
        // Storage
        Box::new(STORAGE_WRITES.clone()),
        Box::new(STORAGE_LOADS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    #[must_use]
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
