//! Domain layer for the Tactician planning engine
//!
//! This module contains core models, errors and the ports implemented by
//! adapters.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{
    DomainError, DomainResult, ExecutionError, PlanningError, RepositoryError, TransientKind,
};
