//! Execution plan domain models.
//!
//! A plan is the annotated, phase-ordered arrangement of a set of tasks.
//! Plans are immutable once created; task state lives in the repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::intent::RiskLevel;

/// A batch of tasks eligible to execute together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPhase {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Member tasks in dispatch order
    pub task_ids: Vec<Uuid>,
    /// Phases that must fully succeed before this one starts
    pub dependencies: BTreeSet<Uuid>,
    pub parallelizable: bool,
    /// Minutes
    pub estimated_duration: u64,
    pub on_critical_path: bool,
}

impl ExecutionPhase {
    pub fn contains(&self, task_id: Uuid) -> bool {
        self.task_ids.contains(&task_id)
    }
}

/// A named checkpoint on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub name: String,
    pub due_date: DateTime<Utc>,
    /// Earlier milestones this one follows
    pub dependencies: Vec<Uuid>,
    /// Titles of the tasks delivered by this milestone
    pub deliverables: Vec<String>,
}

/// Schedule estimate for a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub estimated_start: DateTime<Utc>,
    pub estimated_end: DateTime<Utc>,
    /// Heuristic selection of schedule-driving tasks, in plan order
    pub critical_path: Vec<Uuid>,
    pub milestones: Vec<Milestone>,
}

impl Timeline {
    pub fn total_minutes(&self) -> i64 {
        (self.estimated_end - self.estimated_start).num_minutes()
    }
}

/// Severity of an identified risk.
pub type Severity = RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    /// The task itself is risky
    Technical,
    /// The task sits on many dependencies
    Dependency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub id: Uuid,
    pub description: String,
    pub probability: f64,
    pub impact: f64,
    pub severity: Severity,
    pub category: RiskCategory,
    /// Task the risk was raised for
    pub task_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mitigation {
    pub risk_id: Uuid,
    pub strategy: String,
    pub description: String,
    pub cost: f64,
    pub effectiveness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: RiskLevel,
    pub risks: Vec<Risk>,
    pub mitigations: Vec<Mitigation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Cpu,
    Memory,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::Cpu => "cores",
            Self::Memory => "MB",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared resource cap for executing the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirement {
    pub kind: ResourceKind,
    pub amount: f64,
    pub unit: String,
    /// Minutes the resource is expected to be held
    pub duration_minutes: u64,
}

/// The complete, annotated plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// All task ids, dependencies before dependents
    pub task_ids: Vec<Uuid>,
    pub phases: Vec<ExecutionPhase>,
    pub timeline: Timeline,
    pub resources: Vec<ResourceRequirement>,
    pub risk_assessment: RiskAssessment,
    pub created_at: DateTime<Utc>,
}

impl ExecutionPlan {
    /// Declared cap for a resource kind, if the plan declares one.
    pub fn resource_cap(&self, kind: ResourceKind) -> Option<f64> {
        self.resources
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| r.amount)
    }

    pub fn phase_of(&self, task_id: Uuid) -> Option<&ExecutionPhase> {
        self.phases.iter().find(|p| p.contains(task_id))
    }
}
