//! Domain errors for the Tactician planning and execution engine.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use super::models::{ResourceKind, TaskStatus};

/// Format a cycle path as a human-readable string: `A -> B -> C -> A`.
fn format_cycle_path(path: &[Uuid]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors that abort plan creation. No partial plan is produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanningError {
    #[error("Decomposition produced no tasks")]
    NoTasks,

    #[error("Circular dependency detected at task {task_id}: {}", format_cycle_path(.cycle))]
    CircularDependency { task_id: Uuid, cycle: Vec<Uuid> },

    #[error("Task {task_id} depends on unknown task {dependency_id}")]
    UnknownDependency { task_id: Uuid, dependency_id: Uuid },

    #[error("Invalid intent: {0}")]
    InvalidIntent(String),
}

/// Why a transient failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    Timeout,
    ResourceContention,
    Other,
}

/// Task-scoped execution errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("No viable strategy for task {task_id} (best score {best_score:.2})")]
    NoViableStrategy { task_id: Uuid, best_score: f64 },

    #[error("Transient failure ({kind:?}): {message}")]
    Transient { kind: TransientKind, message: String },

    #[error("Structural failure: {0}")]
    Structural(String),

    #[error("Resource {resource} exhausted: requested {requested:.2}, available {available:.2}")]
    ResourceExhausted {
        resource: ResourceKind,
        requested: f64,
        available: f64,
    },

    #[error("Execution cancelled")]
    Cancelled,
}

impl ExecutionError {
    pub fn timeout(after: Duration) -> Self {
        Self::Transient {
            kind: TransientKind::Timeout,
            message: format!("timed out after {}ms", after.as_millis()),
        }
    }

    pub fn contention(message: impl Into<String>) -> Self {
        Self::Transient {
            kind: TransientKind::ResourceContention,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            kind: TransientKind::Other,
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }

    /// Only transient failures are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Failures that end the task immediately and may cascade.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_) | Self::NoViableStrategy { .. })
    }
}

/// Errors raised by the plan repository.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Plan not found: {0}")]
    PlanNotFound(Uuid),

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Invalid state transition for task {task_id} from {from} to {to}: {reason}")]
    InvalidTransition {
        task_id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
        reason: String,
    },
}

/// Top-level error for the crate.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_names_path() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let err = PlanningError::CircularDependency {
            task_id: a,
            cycle: vec![a, b, a],
        };
        let msg = err.to_string();
        assert!(msg.contains(&format!("{a} -> {b} -> {a}")));
    }

    #[test]
    fn test_retry_classification() {
        assert!(ExecutionError::timeout(Duration::from_secs(1)).is_retryable());
        assert!(ExecutionError::contention("busy").is_retryable());
        assert!(!ExecutionError::structural("bad").is_retryable());
        assert!(ExecutionError::structural("bad").is_structural());
        assert!(ExecutionError::NoViableStrategy {
            task_id: Uuid::nil(),
            best_score: 0.1
        }
        .is_structural());
        assert!(!ExecutionError::Cancelled.is_retryable());
        assert!(!ExecutionError::Cancelled.is_structural());
    }
}
