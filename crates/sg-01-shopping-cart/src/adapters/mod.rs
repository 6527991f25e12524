//! # Adapters
//!
//! In-process implementations of the outbound ports. The mocks back the
//! test suites and the demo runtime; a production host plugs in its own
//! HTTP client and catalog.

pub mod mock;

pub use mock::{MockCheckoutApi, MockProductLookup, MockTimeSource, RecordingScheduler};
