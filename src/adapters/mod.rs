//! Adapters implementing the domain ports.

pub mod memory;
pub mod strategies;
