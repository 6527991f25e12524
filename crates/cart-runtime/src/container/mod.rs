//! # Cart Container
//!
//! Central container holding all cart subsystem instances with proper
//! lifetime management and dependency injection.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, RuntimeConfig};
pub use subsystems::{CartContainer, Collaborators};
