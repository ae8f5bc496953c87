//! Execution-time domain models shared by the engine, the strategy
//! selector and strategy implementations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::task::{Task, TaskType};

/// Coarse complexity band used to match similar tasks in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityBucket {
    /// 1-3
    Low,
    /// 4-6
    Medium,
    /// 7-10
    High,
}

impl ComplexityBucket {
    pub fn from_complexity(complexity: u8) -> Self {
        match complexity {
            0..=3 => Self::Low,
            4..=6 => Self::Medium,
            _ => Self::High,
        }
    }
}

/// Identity of "a task like this one" for adaptive selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskSignature {
    pub task_type: TaskType,
    pub bucket: ComplexityBucket,
}

impl TaskSignature {
    pub fn of(task: &Task) -> Self {
        Self {
            task_type: task.task_type,
            bucket: ComplexityBucket::from_complexity(task.estimated_complexity),
        }
    }
}

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    TransientFailure,
    StructuralFailure,
    Cancelled,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// One recorded attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Monotonic sequence number within the owning history
    pub sequence: u64,
    pub signature: TaskSignature,
    pub strategy: String,
    pub outcome: AttemptOutcome,
    pub duration: Duration,
    pub recorded_at: DateTime<Utc>,
}

const OVERSUBSCRIPTION_TOLERANCE: f64 = 1e-9;

/// Point-in-time view of resource usage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ResourceSnapshot {
    pub cpu_used: f64,
    pub cpu_cap: f64,
    pub memory_used_mb: f64,
    pub memory_cap_mb: f64,
}

impl ResourceSnapshot {
    pub fn cpu_available(&self) -> f64 {
        (self.cpu_cap - self.cpu_used).max(0.0)
    }

    pub fn memory_available_mb(&self) -> f64 {
        (self.memory_cap_mb - self.memory_used_mb).max(0.0)
    }

    /// Usage above a cap. Reservations fill caps exactly, so zero headroom
    /// alone is not contention.
    pub fn is_oversubscribed(&self) -> bool {
        self.cpu_used > self.cpu_cap + OVERSUBSCRIPTION_TOLERANCE
            || self.memory_used_mb > self.memory_cap_mb + OVERSUBSCRIPTION_TOLERANCE
    }
}

/// What a strategy is told about the attempt it is running.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyContext {
    pub plan_id: Uuid,
    /// Zero-based attempt number
    pub attempt: u32,
    pub resources: ResourceSnapshot,
}

/// What a strategy reports back on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StrategyOutput {
    pub summary: String,
    #[serde(default)]
    pub artifacts: Vec<String>,
}

impl StrategyOutput {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            artifacts: Vec::new(),
        }
    }

    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifacts.push(artifact.into());
        self
    }
}
