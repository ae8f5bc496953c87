//! Tactician - Task Planning & Execution Engine
//!
//! Tactician turns a classified user intent into a dependency-ordered,
//! phased execution plan and then carries the plan out task by task through
//! pluggable execution strategies, tracking resources and adapting strategy
//! choice from history.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the repository/strategy ports
//! - **Service Layer** (`services`): planning algorithms, history and strategy selection
//! - **Application Layer** (`application`): the execution engine
//! - **Adapters** (`adapters`): in-memory repository and built-in strategies
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tactician::adapters::memory::InMemoryPlanRepository;
//! use tactician::adapters::strategies::StrategyRegistry;
//! use tactician::application::ExecutionEngine;
//! use tactician::domain::models::{Config, Intent, IntentKind};
//! use tactician::services::TaskPlanner;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let repo = Arc::new(InMemoryPlanRepository::new());
//! let planner = TaskPlanner::new(Arc::clone(&repo), &config.planner);
//! let plan = planner
//!     .create_execution_plan(&Intent::new(IntentKind::TaskRequest, "implement rate limiter"))
//!     .await?;
//!
//! let selector = StrategyRegistry::new().selector(config.engine.viability_threshold);
//! let engine = ExecutionEngine::new(repo, selector, config.engine);
//! let report = engine.execute_plan(plan.id).await?;
//! println!("{}", report.status());
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{ExecutionEngine, ExecutionEvent, ExecutionReport, ExecutionStatus};
pub use domain::errors::{
    DomainError, DomainResult, ExecutionError, PlanningError, RepositoryError,
};
pub use domain::models::{
    Config, ExecutionPhase, ExecutionPlan, Intent, IntentKind, Task, TaskStatus, TaskType,
};
pub use domain::ports::{ExecutionStrategy, PlanRepository};
pub use services::{StrategySelector, TaskPlanner};
