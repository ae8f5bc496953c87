//! Execution strategy port - pluggable implementations that carry out a
//! task's work.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::domain::errors::ExecutionError;
use crate::domain::models::{StrategyContext, StrategyOutput, Task, TaskType};

/// What a strategy declares about itself at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyCapabilities {
    pub supported_types: BTreeSet<TaskType>,
}

impl StrategyCapabilities {
    pub fn new(types: impl IntoIterator<Item = TaskType>) -> Self {
        Self {
            supported_types: types.into_iter().collect(),
        }
    }

    pub fn all() -> Self {
        Self::new(TaskType::ALL)
    }

    pub fn supports(&self, task_type: TaskType) -> bool {
        self.supported_types.contains(&task_type)
    }
}

/// Trait for execution strategy implementations.
///
/// The engine treats `execute` as opaque: it may call out to AI
/// completion, the filesystem or a shell. The engine wraps every call
/// in a timeout and races it against plan cancellation.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// Strategy name, used as the history key.
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> StrategyCapabilities;

    /// Fitness for the given task in `[0.0, 1.0]`.
    fn suitability(&self, task: &Task) -> f64;

    /// Per-attempt timeout. `None` uses the engine default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn execute(
        &self,
        task: &Task,
        context: &StrategyContext,
    ) -> Result<StrategyOutput, ExecutionError>;
}
