//! Schedule estimation for a phased plan.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::models::{ExecutionPhase, Milestone, Task, Timeline};

/// Builds a plan's timeline from phase durations.
///
/// The critical path is a heuristic filter, not a longest-path
/// computation: every task with complexity of at least 5 or with any
/// dependency is on it, in plan order.
#[derive(Debug, Clone, Default)]
pub struct TimelineEstimator;

impl TimelineEstimator {
    pub fn new() -> Self {
        Self
    }

    pub fn estimate(
        &self,
        start: DateTime<Utc>,
        tasks: &[Task],
        phases: &[ExecutionPhase],
    ) -> Timeline {
        let mut elapsed: u64 = 0;
        let mut milestones: Vec<Milestone> = Vec::with_capacity(phases.len());

        for phase in phases {
            elapsed += phase.estimated_duration;
            let deliverables = phase
                .task_ids
                .iter()
                .filter_map(|id| tasks.iter().find(|t| t.id == *id))
                .map(|t| t.title.clone())
                .collect();

            milestones.push(Milestone {
                id: Uuid::new_v4(),
                name: format!("Complete {}", phase.name),
                due_date: start + minutes(elapsed),
                dependencies: milestones.last().map(|m| m.id).into_iter().collect(),
                deliverables,
            });
        }

        Timeline {
            estimated_start: start,
            estimated_end: start + minutes(elapsed),
            critical_path: tasks
                .iter()
                .filter(|t| t.estimated_complexity >= 5 || !t.dependencies.is_empty())
                .map(|t| t.id)
                .collect(),
            milestones,
        }
    }
}

fn minutes(m: u64) -> Duration {
    Duration::minutes(i64::try_from(m).unwrap_or(i64::MAX / 60_000))
}
