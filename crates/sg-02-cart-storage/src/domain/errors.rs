//! Cart storage errors.

use thiserror::Error;

/// Cart storage errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Reading or writing the backing store failed.
    #[error("I/O error: {message}")]
    Io {
        /// Underlying error text.
        message: String,
    },

    /// The cart could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Underlying error text.
        message: String,
    },

    /// A blocking task panicked or was cancelled.
    #[error("Background task failed: {message}")]
    Task {
        /// Underlying error text.
        message: String,
    },
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}
