//! # Event Subscriber
//!
//! Receiving side of the bus. A listener that falls behind loses the
//! oldest events; the loss is counted and logged, and delivery resumes
//! with the oldest event still buffered.

use crate::events::{CartEvent, EventFilter};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The bus was dropped.
    #[error("Event bus closed")]
    Closed,
}

/// A filtered listener on the bus.
pub struct Subscription {
    receiver: broadcast::Receiver<CartEvent>,
    filter: EventFilter,
    missed: u64,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<CartEvent>, filter: EventFilter) -> Self {
        Self {
            receiver,
            filter,
            missed: 0,
        }
    }

    /// Wait for the next matching event. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<CartEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(count)) => self.record_lag(count),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next matching event if one is buffered.
    pub fn try_recv(&mut self) -> Result<Option<CartEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(count)) => self.record_lag(count),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    /// Events lost because this listener fell behind.
    #[must_use]
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// The topic filter.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    fn record_lag(&mut self, count: u64) {
        self.missed += count;
        warn!(skipped = count, total = self.missed, "Cart event listener fell behind");
    }
}

type FilteredEvents = Pin<Box<dyn Stream<Item = CartEvent> + Send>>;

/// A [`Subscription`] as a `Stream`, for hosts that compose event streams.
pub struct EventStream {
    inner: FilteredEvents,
    filter: EventFilter,
}

impl EventStream {
    pub(crate) fn new(receiver: broadcast::Receiver<CartEvent>, filter: EventFilter) -> Self {
        let accept = filter.clone();
        let inner = BroadcastStream::new(receiver).filter_map(move |received| match received {
            Ok(event) if accept.matches(&event) => Some(event),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(count)) => {
                warn!(skipped = count, "Cart event stream fell behind");
                None
            }
        });
        Self {
            inner: Box::pin(inner),
            filter,
        }
    }

    /// The topic filter.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = CartEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
