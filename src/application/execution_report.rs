//! Progress events and the final report of a plan execution.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::TaskStatus;

/// Overall result of executing a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Every task completed
    Completed,
    /// Some tasks completed, others failed or were cancelled
    PartiallyCompleted,
    /// No task completed
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::PartiallyCompleted => "partially_completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final state of one task after a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task_id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    /// Attempts started during this run
    pub attempts: u32,
    pub retry_count: u32,
    /// Strategy used by the last attempt
    pub strategy: Option<String>,
    pub error: Option<String>,
}

/// Results of executing a plan, one outcome per task in plan order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub plan_id: Uuid,
    pub cancelled: bool,
    pub duration_ms: u64,
    pub outcomes: Vec<TaskOutcome>,
}

impl ExecutionReport {
    pub fn status(&self) -> ExecutionStatus {
        let completed = self.completed_count();
        if completed == self.outcomes.len() {
            ExecutionStatus::Completed
        } else if completed > 0 {
            ExecutionStatus::PartiallyCompleted
        } else {
            ExecutionStatus::Failed
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.outcomes.len() as f64
    }

    pub fn completed_count(&self) -> usize {
        self.count(TaskStatus::Completed)
    }

    pub fn failed_count(&self) -> usize {
        self.count(TaskStatus::Failed)
    }

    pub fn cancelled_count(&self) -> usize {
        self.count(TaskStatus::Cancelled)
    }

    pub fn outcome(&self, task_id: Uuid) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| o.task_id == task_id)
    }

    fn count(&self, status: TaskStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Event emitted during execution.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    PlanStarted {
        plan_id: Uuid,
        total_tasks: usize,
        phase_count: usize,
    },
    /// Phase numbers are 1-based.
    PhaseStarted {
        phase: usize,
        name: String,
        task_count: usize,
    },
    TaskStarted {
        task_id: Uuid,
        title: String,
        strategy: &'static str,
        attempt: u32,
    },
    /// Dispatch would exceed a resource cap; the task stays pending.
    TaskDeferred { task_id: Uuid, reason: String },
    TaskRetrying {
        task_id: Uuid,
        retry: u32,
        max_retries: u32,
        error: String,
    },
    TaskCompleted {
        task_id: Uuid,
        strategy: &'static str,
        attempts: u32,
    },
    TaskFailed {
        task_id: Uuid,
        error: String,
        attempts: u32,
    },
    PhaseCompleted {
        phase: usize,
        succeeded: usize,
        failed: usize,
    },
    PhaseSkipped { phase: usize, reason: String },
    PlanCompleted {
        status: ExecutionStatus,
        success_rate: f64,
    },
}
