//! Built-in strategies.
//!
//! These carry no external collaborators: each one describes the work it
//! would hand to an AI-completion or shell backend and reports it as done.
//! They exist so plans can be run end to end from the CLI.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::errors::ExecutionError;
use crate::domain::models::{StrategyContext, StrategyOutput, Task, TaskType};
use crate::domain::ports::{ExecutionStrategy, StrategyCapabilities};

/// Single-shot execution for small, low-risk work.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectStrategy;

impl DirectStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutionStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn capabilities(&self) -> StrategyCapabilities {
        StrategyCapabilities::all()
    }

    fn suitability(&self, task: &Task) -> f64 {
        let base: f64 = match task.estimated_complexity {
            0..=3 => 0.8,
            4..=6 => 0.5,
            _ => 0.2,
        };
        if task.context.is_high_risk() {
            base - 0.2
        } else {
            base
        }
    }

    async fn execute(
        &self,
        task: &Task,
        context: &StrategyContext,
    ) -> Result<StrategyOutput, ExecutionError> {
        debug!(task_id = %task.id, attempt = context.attempt, "direct execution");
        Ok(StrategyOutput::new(format!("{}: done", task.title)))
    }
}

/// Most steps an incremental run is split into.
const MAX_INCREMENTAL_STEPS: u8 = 4;

/// Works through a task in small steps, one artifact per step. Suited to
/// code-producing task types.
#[derive(Debug, Default, Clone, Copy)]
pub struct IncrementalStrategy;

impl IncrementalStrategy {
    pub fn new() -> Self {
        Self
    }

    fn steps_for(task: &Task) -> u8 {
        task.estimated_complexity
            .div_ceil(2)
            .clamp(1, MAX_INCREMENTAL_STEPS)
    }
}

#[async_trait]
impl ExecutionStrategy for IncrementalStrategy {
    fn name(&self) -> &'static str {
        "incremental"
    }

    fn capabilities(&self) -> StrategyCapabilities {
        StrategyCapabilities::new([
            TaskType::Implementation,
            TaskType::Refactoring,
            TaskType::Optimization,
            TaskType::Integration,
            TaskType::Debugging,
        ])
    }

    fn suitability(&self, task: &Task) -> f64 {
        (0.4 + 0.05 * f64::from(task.estimated_complexity)).min(0.9)
    }

    async fn execute(
        &self,
        task: &Task,
        context: &StrategyContext,
    ) -> Result<StrategyOutput, ExecutionError> {
        let steps = Self::steps_for(task);
        let mut output = StrategyOutput::new(format!("{}: done in {steps} steps", task.title));
        for step in 1..=steps {
            debug!(task_id = %task.id, step, attempt = context.attempt, "incremental step");
            output = output.with_artifact(format!("{}#step-{step}", task.id));
            tokio::task::yield_now().await;
        }
        Ok(output)
    }
}

/// Review-heavy execution for high-risk or hard-to-diagnose work.
#[derive(Debug, Default, Clone, Copy)]
pub struct CautiousStrategy;

impl CautiousStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutionStrategy for CautiousStrategy {
    fn name(&self) -> &'static str {
        "cautious"
    }

    fn capabilities(&self) -> StrategyCapabilities {
        StrategyCapabilities::all()
    }

    fn suitability(&self, task: &Task) -> f64 {
        if task.context.is_high_risk() {
            0.9
        } else if matches!(task.task_type, TaskType::Debugging | TaskType::Integration) {
            0.7
        } else {
            0.35
        }
    }

    async fn execute(
        &self,
        task: &Task,
        context: &StrategyContext,
    ) -> Result<StrategyOutput, ExecutionError> {
        if context.resources.is_oversubscribed() {
            return Err(ExecutionError::contention("resources oversubscribed, review pass postponed"));
        }
        debug!(task_id = %task.id, attempt = context.attempt, "cautious execution");
        Ok(StrategyOutput::new(format!("{}: done and reviewed", task.title))
            .with_artifact(format!("{}#review", task.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ResourceSnapshot, RiskLevel};
    use uuid::Uuid;

    fn context() -> StrategyContext {
        StrategyContext {
            plan_id: Uuid::new_v4(),
            attempt: 0,
            resources: ResourceSnapshot {
                cpu_used: 0.2,
                cpu_cap: 1.0,
                memory_used_mb: 0.0,
                memory_cap_mb: 500.0,
            },
        }
    }

    #[test]
    fn test_direct_prefers_simple_tasks() {
        let simple = Task::new("a", "", TaskType::Analysis);
        let hard = Task::new("o", "", TaskType::Optimization);
        assert!(DirectStrategy.suitability(&simple) > DirectStrategy.suitability(&hard));
    }

    #[test]
    fn test_incremental_capabilities() {
        let caps = IncrementalStrategy::new().capabilities();
        assert!(caps.supports(TaskType::Implementation));
        assert!(!caps.supports(TaskType::Documentation));
    }

    #[test]
    fn test_cautious_prefers_high_risk() {
        let mut task = Task::new("t", "", TaskType::Testing);
        let normal = CautiousStrategy.suitability(&task);
        task.context.risk_level = RiskLevel::High;
        assert!(CautiousStrategy.suitability(&task) > normal);
        assert!(CautiousStrategy.suitability(&task) > DirectStrategy.suitability(&task));
    }

    #[tokio::test]
    async fn test_incremental_emits_step_artifacts() {
        let task = Task::new("Implement", "", TaskType::Implementation);
        let output = IncrementalStrategy::new()
            .execute(&task, &context())
            .await
            .unwrap();
        // complexity 5 -> 3 steps
        assert_eq!(output.artifacts.len(), 3);
        assert!(!output.summary.is_empty());
    }

    #[tokio::test]
    async fn test_cautious_runs_with_caps_fully_reserved() {
        let mut task = Task::new("Fix", "", TaskType::Debugging);
        task.context.risk_level = RiskLevel::High;
        let mut ctx = context();
        ctx.resources.cpu_used = ctx.resources.cpu_cap;
        ctx.resources.memory_used_mb = ctx.resources.memory_cap_mb;

        let output = CautiousStrategy.execute(&task, &ctx).await.unwrap();
        assert_eq!(output.artifacts, vec![format!("{}#review", task.id)]);
    }

    #[tokio::test]
    async fn test_cautious_backs_off_when_oversubscribed() {
        let task = Task::new("Fix", "", TaskType::Debugging);
        let mut ctx = context();
        ctx.resources.cpu_used = 1.5;

        let err = CautiousStrategy.execute(&task, &ctx).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_incremental_step_count_is_capped() {
        let mut task = Task::new("Integrate", "", TaskType::Integration);
        task.estimated_complexity = 10;
        let output = IncrementalStrategy::new()
            .execute(&task, &context())
            .await
            .unwrap();
        assert_eq!(output.artifacts.len(), usize::from(MAX_INCREMENTAL_STEPS));
    }

    #[tokio::test]
    async fn test_builtins_produce_output() {
        let task = Task::new("Analyze", "", TaskType::Analysis);
        let ctx = context();
        assert!(!DirectStrategy.execute(&task, &ctx).await.unwrap().summary.is_empty());
        assert!(!CautiousStrategy.execute(&task, &ctx).await.unwrap().summary.is_empty());
    }
}
