//! Restartable delay handle.
//!
//! `schedule` aborts the pending timer and starts a new one. When a timer
//! expires its work is spawned as a separate task, so aborting a later
//! timer never cancels work that already started.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

/// A single restartable timer.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Create a debouncer firing `delay` after the last `schedule`.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// The configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `work` after the delay, replacing any pending timer.
    ///
    /// Returns `false` when called outside a tokio runtime; nothing is
    /// scheduled then.
    pub fn schedule<F, Fut>(&self, work: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            warn!("Debounce requested outside a tokio runtime, ignoring");
            return false;
        };
        let delay = self.delay;
        let spawner = runtime.clone();
        let timer = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            spawner.spawn(work());
        });

        if let Some(previous) = self.pending.lock().replace(timer) {
            previous.abort();
        }
        true
    }

    /// Abort the pending timer. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    /// Whether a timer is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}
