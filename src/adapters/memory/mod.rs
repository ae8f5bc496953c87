//! In-memory implementations of the repository ports.

mod plan_repository;

pub use plan_repository::InMemoryPlanRepository;
