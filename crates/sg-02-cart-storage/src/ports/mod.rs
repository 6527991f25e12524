//! Ports (hexagonal boundaries) for the Cart Storage subsystem.

pub mod outbound;

pub use outbound::CartStore;
