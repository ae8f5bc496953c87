pub mod config;
pub mod execution;
pub mod intent;
pub mod plan;
pub mod task;

pub use config::{Config, EngineConfig, LogFormat, LoggingConfig, PlannerConfig, RotationPolicy};
pub use execution::{
    AttemptOutcome, ComplexityBucket, HistoryEntry, ResourceSnapshot, StrategyContext,
    StrategyOutput, TaskSignature,
};
pub use intent::{Complexity, Intent, IntentEntities, IntentKind, RiskLevel};
pub use plan::{
    ExecutionPhase, ExecutionPlan, Milestone, Mitigation, ResourceKind, ResourceRequirement, Risk,
    RiskAssessment, RiskCategory, Severity, Timeline,
};
pub use task::{Impact, Scope, Task, TaskContext, TaskStatus, TaskType, ValidationRule};
