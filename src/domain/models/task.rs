//! Task domain model.
//!
//! Tasks are the atomic units of planned work. They form a DAG through
//! their `dependencies` and are grouped into phases by the planner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use super::intent::RiskLevel;

/// Status of a task in the execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created by decomposition, waiting for dispatch
    #[default]
    Pending,
    /// Currently being executed by a strategy
    Running,
    /// Task completed successfully
    Completed,
    /// Task failed (may return to pending while retry budget remains)
    Failed,
    /// Task was cancelled before or during execution
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Valid transitions from this status.
    ///
    /// `Pending -> Failed` covers tasks failed before they ever ran (no
    /// viable strategy, cascaded phase failure). `Running -> Pending`
    /// requeues an attempt the strategy could not place; it consumes no
    /// retry.
    pub fn valid_transitions(&self) -> &'static [TaskStatus] {
        match self {
            Self::Pending => &[Self::Running, Self::Failed, Self::Cancelled],
            Self::Running => &[Self::Completed, Self::Failed, Self::Cancelled, Self::Pending],
            Self::Failed => &[Self::Pending],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Analysis,
    Implementation,
    Testing,
    Documentation,
    Refactoring,
    Debugging,
    Optimization,
    Integration,
}

impl TaskType {
    pub const ALL: [TaskType; 8] = [
        Self::Analysis,
        Self::Implementation,
        Self::Testing,
        Self::Documentation,
        Self::Refactoring,
        Self::Debugging,
        Self::Optimization,
        Self::Integration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Implementation => "implementation",
            Self::Testing => "testing",
            Self::Documentation => "documentation",
            Self::Refactoring => "refactoring",
            Self::Debugging => "debugging",
            Self::Optimization => "optimization",
            Self::Integration => "integration",
        }
    }

    /// Complexity assumed when a task does not specify one.
    pub fn default_complexity(&self) -> u8 {
        match self {
            Self::Analysis | Self::Documentation => 2,
            Self::Testing => 3,
            Self::Refactoring => 4,
            Self::Implementation => 5,
            Self::Debugging => 6,
            Self::Optimization => 7,
            Self::Integration => 8,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a task's changes reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Local,
    Module,
    Global,
}

/// Expected impact of a task's changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    #[default]
    Minimal,
    Moderate,
    Significant,
}

/// Planning context attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaskContext {
    /// Area tags (technologies, concepts)
    #[serde(default)]
    pub areas: Vec<String>,
    /// Files the task is expected to touch
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub impact: Impact,
}

impl TaskContext {
    pub fn is_high_risk(&self) -> bool {
        self.risk_level == RiskLevel::High
    }

    /// True when both contexts reference at least one common file.
    pub fn shares_files_with(&self, other: &Self) -> bool {
        self.files.iter().any(|f| other.files.contains(f))
    }
}

/// Post-execution check applied to a strategy's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule", content = "value")]
pub enum ValidationRule {
    /// The strategy must report a non-empty summary.
    NonEmptyOutput,
    /// The strategy must report an artifact with this name.
    ProducesArtifact(String),
}

/// A unit of planned work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    pub status: TaskStatus,
    /// Lower runs earlier
    pub priority: u32,
    /// 1-10
    pub estimated_complexity: u8,
    pub dependencies: BTreeSet<Uuid>,
    pub context: TaskContext,
    pub constraints: Vec<String>,
    pub validation: Vec<ValidationRule>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a pending task with the defaults for its type.
    pub fn new(title: impl Into<String>, description: impl Into<String>, task_type: TaskType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            task_type,
            status: TaskStatus::Pending,
            priority: 50,
            estimated_complexity: task_type.default_complexity(),
            dependencies: BTreeSet::new(),
            context: TaskContext::default(),
            constraints: Vec::new(),
            validation: Vec::new(),
            retry_count: 0,
            max_retries: 3,
            error: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    pub fn depends_on(&self, other: Uuid) -> bool {
        self.dependencies.contains(&other)
    }

    /// Tasks conflict when they are directly linked or touch the same files.
    pub fn conflicts_with(&self, other: &Self) -> bool {
        self.depends_on(other.id)
            || other.depends_on(self.id)
            || self.context.shares_files_with(&other.context)
    }

    /// Implementation work and high-risk work always run on their own.
    pub fn requires_serial_execution(&self) -> bool {
        self.task_type == TaskType::Implementation || self.context.is_high_risk()
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Apply a status transition, stamping timestamps.
    ///
    /// `Failed -> Pending` consumes one retry and is refused once the
    /// budget is spent.
    pub fn transition_to(&mut self, new_status: TaskStatus) -> Result<(), String> {
        if !self.status.can_transition_to(new_status) {
            return Err(format!(
                "Cannot transition from {} to {}",
                self.status, new_status
            ));
        }
        if self.status == TaskStatus::Failed && new_status == TaskStatus::Pending {
            if !self.can_retry() {
                return Err(format!(
                    "Retry budget exhausted ({}/{})",
                    self.retry_count, self.max_retries
                ));
            }
            self.retry_count += 1;
        }

        let now = Utc::now();
        match new_status {
            TaskStatus::Running => self.started_at = Some(now),
            TaskStatus::Completed => {
                self.completed_at = Some(now);
                self.error = None;
            }
            TaskStatus::Failed | TaskStatus::Cancelled => self.completed_at = Some(now),
            TaskStatus::Pending => self.completed_at = None,
        }
        self.status = new_status;
        self.updated_at = now;
        Ok(())
    }
}
