pub mod execution_strategy;
pub mod plan_repository;

pub use execution_strategy::{ExecutionStrategy, StrategyCapabilities};
pub use plan_repository::PlanRepository;
