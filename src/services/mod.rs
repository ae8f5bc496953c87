pub mod dependency_analyzer;
pub mod execution_history;
pub mod phase_grouper;
pub mod resource_estimator;
pub mod resource_state;
pub mod risk_assessor;
pub mod strategy_selector;
pub mod task_factory;
pub mod task_planner;
pub mod timeline_estimator;

pub use dependency_analyzer::DependencyAnalyzer;
pub use execution_history::ExecutionHistory;
pub use phase_grouper::PhaseGrouper;
pub use resource_estimator::ResourceEstimator;
pub use resource_state::{ResourceDemand, ResourceState};
pub use risk_assessor::RiskAssessor;
pub use strategy_selector::{StrategyChoice, StrategySelector};
pub use task_factory::{TaskDraft, TaskFactory};
pub use task_planner::TaskPlanner;
pub use timeline_estimator::TimelineEstimator;
