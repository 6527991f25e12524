//! # Reconciliation Coordinator
//!
//! Sends the cart to the checkout backend and folds the answer back in.
//!
//! ## Protocol
//!
//! ```text
//! Idle ──request──→ RequestInFlight { token } ──→ Applied
//!                                             ├─→ Discarded (cart changed)
//!                                             └─→ Errored
//! ```
//!
//! The token is the cart's modification count when the request was sent.
//! It is compared again after the backend answered and after product
//! lookups finished; a mismatch discards the answer without touching the
//! cart or the cached checkout data. Failures are not retried; the next
//! mutation triggers a new attempt.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use scango_telemetry::{
    metric_inc, time_histogram, RECONCILE_DURATION, RECONCILE_OUTCOMES, RECONCILE_REQUESTS,
};
use shared_types::{Cents, PaymentMethodInfo, Product, SignedCheckoutInfo};
use tracing::{debug, info, warn};

use super::debounce::Debouncer;
use crate::domain::{CheckoutFailure, ReconcileError};
use crate::ports::{CheckoutApi, ProductLookup, UpdateMode, UpdateScheduler};
use crate::service::{Commit, ShoppingCart};

/// Why a reconciliation did not contact the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing to price.
    EmptyCart,
    /// The last applied answer is still current.
    UpToDate,
}

/// Result of one reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No request was sent.
    Skipped(SkipReason),
    /// The answer was applied.
    Applied {
        /// Modification count the answer was for.
        token: u64,
        /// Committed online total.
        total: Cents,
    },
    /// The cart changed while the request was in flight.
    Discarded {
        /// Token the request was sent with.
        sent: u64,
        /// Modification count when the answer arrived.
        current: u64,
    },
    /// The backend rejected the cart or the answer could not be applied.
    Errored(ReconcileError),
}

impl ReconcileOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Skipped(_) => "skipped",
            Self::Applied { .. } => "applied",
            Self::Discarded { .. } => "discarded",
            Self::Errored(_) => "errored",
        }
    }
}

/// Coordinator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePhase {
    /// No request outstanding.
    #[default]
    Idle,
    /// A request with `token` is outstanding.
    RequestInFlight {
        /// Modification count the request was sent with.
        token: u64,
    },
}

#[derive(Default)]
struct UpdaterStatus {
    in_flight: Vec<u64>,
    verified: bool,
    last_successful_count: Option<u64>,
    payment_methods: Option<Vec<PaymentMethodInfo>>,
    signed_checkout_info: Option<SignedCheckoutInfo>,
    last_outcome: Option<ReconcileOutcome>,
}

impl UpdaterStatus {
    fn finish(&mut self, token: u64) {
        if let Some(position) = self.in_flight.iter().position(|t| *t == token) {
            self.in_flight.remove(position);
        }
    }

    fn reset_checkout_data(&mut self) {
        self.verified = false;
        self.payment_methods = None;
        self.signed_checkout_info = None;
    }
}

struct UpdaterShared {
    cart: ShoppingCart,
    api: Arc<dyn CheckoutApi>,
    lookup: Arc<dyn ProductLookup>,
    debouncer: Debouncer,
    status: Mutex<UpdaterStatus>,
}

/// Reconciliation coordinator. Cheap to clone.
#[derive(Clone)]
pub struct CartUpdater {
    shared: Arc<UpdaterShared>,
}

/// Scheduler installed on the cart by [`CartUpdater::attach`].
///
/// Holds the coordinator weakly so the cart and the coordinator do not
/// keep each other alive.
struct AttachedScheduler {
    updater: Weak<UpdaterShared>,
}

impl UpdateScheduler for AttachedScheduler {
    fn request_update(&self, mode: UpdateMode) {
        if let Some(shared) = self.updater.upgrade() {
            CartUpdater { shared }.request(mode);
        }
    }
}

impl CartUpdater {
    /// Create a coordinator for `cart`. Call [`CartUpdater::attach`] to
    /// have mutations trigger it.
    pub fn new(
        cart: ShoppingCart,
        api: Arc<dyn CheckoutApi>,
        lookup: Arc<dyn ProductLookup>,
    ) -> Self {
        let debouncer = Debouncer::new(cart.config().debounce_delay());
        Self {
            shared: Arc::new(UpdaterShared {
                cart,
                api,
                lookup,
                debouncer,
                status: Mutex::new(UpdaterStatus::default()),
            }),
        }
    }

    /// Route the cart's reconciliation requests to this coordinator.
    pub fn attach(&self) {
        self.shared.cart.set_scheduler(Arc::new(AttachedScheduler {
            updater: Arc::downgrade(&self.shared),
        }));
    }

    /// The cart this coordinator reconciles.
    pub fn cart(&self) -> &ShoppingCart {
        &self.shared.cart
    }

    /// Ask for a reconciliation.
    ///
    /// `Immediate` cancels any pending debounce and runs a forced update on
    /// a new task. `Debounced` restarts the debounce timer.
    pub fn request(&self, mode: UpdateMode) {
        match mode {
            UpdateMode::Immediate => {
                self.shared.debouncer.cancel();
                let updater = self.clone();
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        runtime.spawn(async move {
                            updater.update(true).await;
                        });
                    }
                    Err(_) => warn!("[sg-01] Immediate update requested outside a runtime"),
                }
            }
            UpdateMode::Debounced => {
                let updater = self.clone();
                self.shared.debouncer.schedule(move || async move {
                    updater.update(false).await;
                });
            }
        }
    }

    /// Whether a debounced update is waiting.
    pub fn is_update_pending(&self) -> bool {
        self.shared.debouncer.is_pending()
    }

    /// Cancel a waiting debounced update.
    pub fn cancel_pending(&self) -> bool {
        self.shared.debouncer.cancel()
    }

    /// Run one reconciliation now.
    ///
    /// Without `force`, an up-to-date cart is not sent again.
    pub async fn update(&self, force: bool) -> ReconcileOutcome {
        let outcome = self.reconcile(force).await;
        metric_inc!(RECONCILE_OUTCOMES, &[outcome.label()]);
        self.shared.status.lock().last_outcome = Some(outcome.clone());
        outcome
    }

    async fn reconcile(&self, force: bool) -> ReconcileOutcome {
        let cart = &self.shared.cart;
        let snapshot = cart.checkout_snapshot();
        let token = snapshot.token;

        if snapshot.item_count == 0 {
            let mut status = self.shared.status.lock();
            status.payment_methods = None;
            status.signed_checkout_info = None;
            debug!("[sg-01] Cart is empty, skipping checkout info");
            return ReconcileOutcome::Skipped(SkipReason::EmptyCart);
        }

        {
            let status = self.shared.status.lock();
            if !force && status.last_successful_count == Some(token) {
                return ReconcileOutcome::Skipped(SkipReason::UpToDate);
            }
        }

        let Some(backend_cart) = snapshot.cart else {
            return self.fail(token, CheckoutFailure::NoShopFound);
        };

        self.shared.status.lock().in_flight.push(token);
        metric_inc!(RECONCILE_REQUESTS);
        debug!(token, items = snapshot.item_count, "[sg-01] Requesting checkout info");

        let result = {
            let _timer = time_histogram!(RECONCILE_DURATION);
            self.shared.api.create_checkout_info(backend_cart).await
        };

        let outcome = match result {
            Ok(response) => self.apply(token, response).await,
            Err(failure) => self.fail(token, failure),
        };
        self.shared.status.lock().finish(token);
        outcome
    }

    async fn apply(
        &self,
        token: u64,
        response: crate::ports::CheckoutInfoResponse,
    ) -> ReconcileOutcome {
        let cart = &self.shared.cart;
        let current = cart.modification_count();
        if current != token {
            return self.discard(token, current);
        }

        let mut checkout_info = response.signed_checkout_info.checkout_info.clone();
        checkout_info.price = response.online_price;

        let substitutions = self
            .lookup_substitutions(cart.substituted_skus(&checkout_info.line_items))
            .await;

        match cart.commit_checkout_info(token, &checkout_info, &substitutions) {
            Commit::Stale { current } => self.discard(token, current),
            Commit::Failed(err) => {
                warn!(token, error = %err, "[sg-01] Checkout info could not be applied");
                self.shared.status.lock().reset_checkout_data();
                ReconcileOutcome::Errored(err)
            }
            Commit::Applied { total } => {
                {
                    let mut status = self.shared.status.lock();
                    status.verified = true;
                    status.last_successful_count = Some(token);
                    status.payment_methods = Some(response.available_payment_methods);
                    status.signed_checkout_info = Some(response.signed_checkout_info);
                }
                info!(token, total, "[sg-01] Checkout info applied");
                ReconcileOutcome::Applied { token, total }
            }
        }
    }

    async fn lookup_substitutions(&self, skus: Vec<String>) -> HashMap<String, Product> {
        let mut substitutions = HashMap::new();
        for sku in skus {
            match self.shared.lookup.find_by_sku_online(&sku).await {
                Ok(product) => {
                    substitutions.insert(sku, product);
                }
                Err(err) => {
                    warn!(sku = %sku, error = %err, "[sg-01] Product lookup failed, keeping local product");
                }
            }
        }
        substitutions
    }

    fn discard(&self, sent: u64, current: u64) -> ReconcileOutcome {
        warn!(sent, current, "[sg-01] Cart changed during request, discarding answer");
        ReconcileOutcome::Discarded { sent, current }
    }

    fn fail(&self, token: u64, failure: CheckoutFailure) -> ReconcileOutcome {
        let cart = &self.shared.cart;
        if !cart.record_checkout_failure(token, &failure) {
            return self.discard(token, cart.modification_count());
        }
        self.shared.status.lock().reset_checkout_data();
        warn!(token, error = %failure, "[sg-01] Checkout info request failed");
        ReconcileOutcome::Errored(ReconcileError::Rejected(failure))
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Current phase.
    pub fn phase(&self) -> UpdatePhase {
        match self.shared.status.lock().in_flight.last() {
            Some(token) => UpdatePhase::RequestInFlight { token: *token },
            None => UpdatePhase::Idle,
        }
    }

    /// Whether the last reconciliation was applied.
    pub fn is_verified(&self) -> bool {
        self.shared.status.lock().verified
    }

    /// Modification count of the last applied answer.
    pub fn last_successful_count(&self) -> Option<u64> {
        self.shared.status.lock().last_successful_count
    }

    /// Payment methods offered for the cart.
    pub fn payment_methods(&self) -> Option<Vec<PaymentMethodInfo>> {
        self.shared.status.lock().payment_methods.clone()
    }

    /// Signed checkout info of the last applied answer.
    pub fn signed_checkout_info(&self) -> Option<SignedCheckoutInfo> {
        self.shared.status.lock().signed_checkout_info.clone()
    }

    /// Outcome of the most recent attempt.
    pub fn last_outcome(&self) -> Option<ReconcileOutcome> {
        self.shared.status.lock().last_outcome.clone()
    }
}
