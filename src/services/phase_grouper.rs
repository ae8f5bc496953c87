//! Batches a validated task set into ordered execution phases.

use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::{ExecutionPhase, Task, TaskType};
use crate::services::DependencyAnalyzer;

/// Minutes of work per complexity point.
pub const MINUTES_PER_COMPLEXITY: u64 = 5;

/// Groups tasks into phases.
///
/// Tasks are taken in ascending priority order. Each phase is seeded with
/// the next unassigned task and absorbs any other unassigned task within
/// one priority step of the seed that does not conflict with a member.
/// A task is only eligible once all of its dependencies sit in earlier
/// phases. Phase `n + 1` depends on phase `n`.
#[derive(Debug, Clone, Default)]
pub struct PhaseGrouper {
    analyzer: DependencyAnalyzer,
}

impl PhaseGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group tasks into phases. The tasks must form a validated DAG.
    pub fn group(&self, tasks: &[Task]) -> Vec<ExecutionPhase> {
        let depths = self.analyzer.dependency_depths(tasks);
        let mut order: Vec<&Task> = tasks.iter().collect();
        // Stable: ties keep input order
        order.sort_by_key(|t| (t.priority, depths.get(&t.id).copied().unwrap_or(0)));

        let mut placed: HashSet<Uuid> = HashSet::with_capacity(tasks.len());
        let mut phases: Vec<ExecutionPhase> = Vec::new();

        while placed.len() < order.len() {
            let ready = |t: &Task, placed: &HashSet<Uuid>| {
                !placed.contains(&t.id) && t.dependencies.iter().all(|d| placed.contains(d))
            };

            let Some(seed) = order.iter().copied().find(|t| ready(*t, &placed)) else {
                // Unreachable for a DAG; guard against looping forever
                break;
            };

            let mut members: Vec<&Task> = vec![seed];
            for &candidate in &order {
                if candidate.id == seed.id
                    || !ready(candidate, &placed)
                    || candidate.priority.abs_diff(seed.priority) > 1
                {
                    continue;
                }
                if members.iter().any(|m| m.conflicts_with(candidate)) {
                    continue;
                }
                members.push(candidate);
            }

            placed.extend(members.iter().map(|t| t.id));
            let phase = build_phase(phases.len() + 1, &members, phases.last());
            debug!(
                phase = %phase.name,
                tasks = phase.task_ids.len(),
                parallelizable = phase.parallelizable,
                "phase formed"
            );
            phases.push(phase);
        }

        phases
    }
}

fn build_phase(number: usize, members: &[&Task], previous: Option<&ExecutionPhase>) -> ExecutionPhase {
    let risky = members
        .iter()
        .any(|t| t.task_type == TaskType::Implementation || t.context.is_high_risk());

    let titles: Vec<&str> = members.iter().map(|t| t.title.as_str()).collect();

    ExecutionPhase {
        id: Uuid::new_v4(),
        name: format!("Phase {number}"),
        description: titles.join(", "),
        task_ids: members.iter().map(|t| t.id).collect(),
        dependencies: previous.map(|p| p.id).into_iter().collect::<BTreeSet<_>>(),
        parallelizable: members.len() > 1 && !risky,
        estimated_duration: members
            .iter()
            .map(|t| u64::from(t.estimated_complexity) * MINUTES_PER_COMPLEXITY)
            .sum(),
        on_critical_path: risky,
    }
}

/// Map each task id to the index of the phase that holds it.
pub fn phase_index(phases: &[ExecutionPhase]) -> HashMap<Uuid, usize> {
    phases
        .iter()
        .enumerate()
        .flat_map(|(i, p)| p.task_ids.iter().map(move |&id| (id, i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RiskLevel;

    fn task(task_type: TaskType, priority: u32) -> Task {
        let mut t = Task::new(format!("{task_type} {priority}"), "", task_type);
        t.priority = priority;
        t
    }

    #[test]
    fn test_adjacent_priorities_share_phase() {
        let a = task(TaskType::Analysis, 1);
        let b = task(TaskType::Testing, 2);
        let c = task(TaskType::Documentation, 4);

        let phases = PhaseGrouper::new().group(&[a.clone(), b.clone(), c.clone()]);

        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].task_ids, vec![a.id, b.id]);
        assert!(phases[0].parallelizable);
        assert_eq!(phases[0].estimated_duration, (2 + 3) * MINUTES_PER_COMPLEXITY);
        assert_eq!(phases[1].task_ids, vec![c.id]);
        assert!(!phases[1].parallelizable);
        assert!(phases[1].dependencies.contains(&phases[0].id));
        assert!(phases[0].dependencies.is_empty());
    }

    #[test]
    fn test_direct_dependency_splits_phase() {
        let a = task(TaskType::Analysis, 1);
        let mut b = task(TaskType::Analysis, 1);
        b.dependencies.insert(a.id);

        let phases = PhaseGrouper::new().group(&[b.clone(), a.clone()]);

        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].task_ids, vec![a.id]);
        assert_eq!(phases[1].task_ids, vec![b.id]);
    }

    #[test]
    fn test_shared_files_split_phase() {
        let mut a = task(TaskType::Analysis, 1);
        let mut b = task(TaskType::Analysis, 1);
        a.context.files = vec!["src/cache.rs".into()];
        b.context.files = vec!["src/cache.rs".into()];

        let phases = PhaseGrouper::new().group(&[a, b]);
        assert_eq!(phases.len(), 2);
    }

    #[test]
    fn test_implementation_blocks_parallelism() {
        let a = task(TaskType::Analysis, 1);
        let b = task(TaskType::Implementation, 1);

        let phases = PhaseGrouper::new().group(&[a, b]);
        assert_eq!(phases.len(), 1);
        assert!(!phases[0].parallelizable);
        assert!(phases[0].on_critical_path);
    }

    #[test]
    fn test_high_risk_blocks_parallelism() {
        let a = task(TaskType::Analysis, 1);
        let mut b = task(TaskType::Testing, 1);
        b.context.risk_level = RiskLevel::High;

        let phases = PhaseGrouper::new().group(&[a, b]);
        assert!(!phases[0].parallelizable);
        assert!(phases[0].on_critical_path);
    }

    #[test]
    fn test_dependency_with_higher_priority_still_runs_first() {
        let late = task(TaskType::Analysis, 9);
        let mut early = task(TaskType::Analysis, 1);
        early.dependencies.insert(late.id);

        let phases = PhaseGrouper::new().group(&[early.clone(), late.clone()]);
        let index = phase_index(&phases);
        assert!(index[&late.id] < index[&early.id]);
    }

    #[test]
    fn test_empty_input() {
        assert!(PhaseGrouper::new().group(&[]).is_empty());
    }
}
