use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use crate::domain::errors::PlanningError;
use crate::domain::models::{Task, TaskType};

/// Service for inferring implicit task dependencies and validating that
/// the resulting graph is acyclic
#[derive(Debug, Clone, Default)]
pub struct DependencyAnalyzer;

/// Traversal state for cycle detection. `resolved` memoizes nodes whose
/// whole subgraph is known to be acyclic.
struct CycleSearch<'a> {
    graph: &'a HashMap<Uuid, Vec<Uuid>>,
    resolved: HashSet<Uuid>,
    on_stack: HashSet<Uuid>,
    path: Vec<Uuid>,
}

impl CycleSearch<'_> {
    fn visit(&mut self, node: Uuid) -> Result<(), PlanningError> {
        if self.resolved.contains(&node) {
            return Ok(());
        }

        let graph = self.graph;
        self.on_stack.insert(node);
        self.path.push(node);

        if let Some(neighbors) = graph.get(&node) {
            for &neighbor in neighbors {
                if self.on_stack.contains(&neighbor) {
                    let start = self
                        .path
                        .iter()
                        .position(|&id| id == neighbor)
                        .unwrap_or(0);
                    let mut cycle = self.path[start..].to_vec();
                    cycle.push(neighbor);
                    return Err(PlanningError::CircularDependency {
                        task_id: neighbor,
                        cycle,
                    });
                }
                self.visit(neighbor)?;
            }
        }

        self.on_stack.remove(&node);
        self.path.pop();
        self.resolved.insert(node);
        Ok(())
    }
}

impl DependencyAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Add the edges implied by task types: later work depends on earlier
    /// work it builds on, where "earlier" means strictly lower priority.
    ///
    /// - implementation depends on every analysis task
    /// - testing depends on every implementation task
    /// - documentation depends on every implementation or testing task
    ///
    /// Returns the number of edges added. Existing edges are not duplicated.
    pub fn add_implicit_dependencies(&self, tasks: &mut [Task]) -> usize {
        let snapshot: Vec<(Uuid, TaskType, u32)> = tasks
            .iter()
            .map(|t| (t.id, t.task_type, t.priority))
            .collect();

        let mut added = 0;
        for task in tasks.iter_mut() {
            let builds_on: &[TaskType] = match task.task_type {
                TaskType::Implementation => &[TaskType::Analysis],
                TaskType::Testing => &[TaskType::Implementation],
                TaskType::Documentation => &[TaskType::Implementation, TaskType::Testing],
                _ => continue,
            };

            for &(id, task_type, priority) in &snapshot {
                if id != task.id
                    && priority < task.priority
                    && builds_on.contains(&task_type)
                    && task.dependencies.insert(id)
                {
                    added += 1;
                }
            }
        }

        debug!(edges_added = added, "implicit dependencies added");
        added
    }

    /// Validate that every dependency exists and the graph is acyclic
    pub fn validate(&self, tasks: &[Task]) -> Result<(), PlanningError> {
        let known: HashSet<Uuid> = tasks.iter().map(|t| t.id).collect();
        for task in tasks {
            if let Some(&missing) = task.dependencies.iter().find(|d| !known.contains(d)) {
                return Err(PlanningError::UnknownDependency {
                    task_id: task.id,
                    dependency_id: missing,
                });
            }
        }

        match self.detect_cycle(tasks) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Depth-first cycle search. Returns the error naming the task that was
    /// reached again while still on the traversal stack.
    pub fn detect_cycle(&self, tasks: &[Task]) -> Option<PlanningError> {
        let graph: HashMap<Uuid, Vec<Uuid>> = tasks
            .iter()
            .map(|t| (t.id, t.dependencies.iter().copied().collect()))
            .collect();

        let mut search = CycleSearch {
            graph: &graph,
            resolved: HashSet::new(),
            on_stack: HashSet::new(),
            path: Vec::new(),
        };

        // Input order keeps the reported cycle deterministic
        tasks.iter().find_map(|task| search.visit(task.id).err())
    }

    /// Order task ids so every dependency precedes its dependents.
    ///
    /// Ready tasks are released lowest priority first, input order breaking
    /// ties (Kahn's algorithm over a priority queue).
    pub fn topological_sort(&self, tasks: &[Task]) -> Result<Vec<Uuid>, PlanningError> {
        if let Some(err) = self.detect_cycle(tasks) {
            return Err(err);
        }

        let index: HashMap<Uuid, usize> = tasks.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
        let mut in_degree: Vec<usize> = vec![0; tasks.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];

        for (i, task) in tasks.iter().enumerate() {
            for dep in &task.dependencies {
                if let Some(&d) = index.get(dep) {
                    dependents[d].push(i);
                    in_degree[i] += 1;
                }
            }
        }

        let mut ready: BinaryHeap<Reverse<(u32, usize)>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(i, _)| Reverse((tasks[i].priority, i)))
            .collect();

        let mut sorted = Vec::with_capacity(tasks.len());
        while let Some(Reverse((_, i))) = ready.pop() {
            sorted.push(tasks[i].id);
            for &next in &dependents[i] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse((tasks[next].priority, next)));
                }
            }
        }

        Ok(sorted)
    }

    /// Longest dependency chain below each task (0 = no dependencies).
    /// Unknown dependency ids are ignored. Call on validated graphs only.
    pub fn dependency_depths(&self, tasks: &[Task]) -> HashMap<Uuid, u32> {
        let by_id: HashMap<Uuid, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
        let mut depths = HashMap::with_capacity(tasks.len());
        for task in tasks {
            depth_of(task, &by_id, &mut depths);
        }
        depths
    }
}

fn depth_of(task: &Task, by_id: &HashMap<Uuid, &Task>, memo: &mut HashMap<Uuid, u32>) -> u32 {
    if let Some(&depth) = memo.get(&task.id) {
        return depth;
    }

    let depth = task
        .dependencies
        .iter()
        .filter_map(|dep| by_id.get(dep))
        .map(|dep| depth_of(dep, by_id, memo) + 1)
        .max()
        .unwrap_or(0);

    memo.insert(task.id, depth);
    depth
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_task(task_type: TaskType, priority: u32) -> Task {
        let mut task = Task::new("Test", "Description", task_type);
        task.priority = priority;
        task
    }

    #[test]
    fn test_implicit_edges_follow_priority() {
        let analyzer = DependencyAnalyzer::new();
        let analysis = create_test_task(TaskType::Analysis, 1);
        let late_analysis = create_test_task(TaskType::Analysis, 9);
        let implementation = create_test_task(TaskType::Implementation, 5);
        let testing = create_test_task(TaskType::Testing, 6);
        let docs = create_test_task(TaskType::Documentation, 7);

        let mut tasks = vec![
            analysis.clone(),
            late_analysis.clone(),
            implementation.clone(),
            testing.clone(),
            docs.clone(),
        ];
        let added = analyzer.add_implicit_dependencies(&mut tasks);

        assert_eq!(added, 4);
        assert!(tasks[2].depends_on(analysis.id));
        assert!(!tasks[2].depends_on(late_analysis.id));
        assert!(tasks[3].depends_on(implementation.id));
        assert!(tasks[4].depends_on(implementation.id));
        assert!(tasks[4].depends_on(testing.id));
    }

    #[test]
    fn test_implicit_edges_skip_equal_priority_and_dedupe() {
        let analyzer = DependencyAnalyzer::new();
        let analysis = create_test_task(TaskType::Analysis, 5);
        let mut implementation = create_test_task(TaskType::Implementation, 5);
        let early = create_test_task(TaskType::Analysis, 1);
        implementation.dependencies.insert(early.id);

        let mut tasks = vec![analysis, early, implementation];
        let added = analyzer.add_implicit_dependencies(&mut tasks);

        assert_eq!(added, 0);
        assert_eq!(tasks[2].dependencies.len(), 1);
    }

    #[test]
    fn test_validate_unknown_dependency() {
        let analyzer = DependencyAnalyzer::new();
        let mut task = create_test_task(TaskType::Analysis, 1);
        let ghost = Uuid::new_v4();
        task.dependencies.insert(ghost);

        let err = analyzer.validate(&[task.clone()]).unwrap_err();
        assert_eq!(
            err,
            PlanningError::UnknownDependency {
                task_id: task.id,
                dependency_id: ghost
            }
        );
    }

    #[test]
    fn test_detect_cycle_with_cycle() {
        let analyzer = DependencyAnalyzer::new();
        let mut a = create_test_task(TaskType::Analysis, 1);
        let mut b = create_test_task(TaskType::Analysis, 2);
        a.dependencies.insert(b.id);
        b.dependencies.insert(a.id);

        match analyzer.validate(&[a.clone(), b.clone()]) {
            Err(PlanningError::CircularDependency { task_id, cycle }) => {
                assert!(task_id == a.id || task_id == b.id);
                assert_eq!(cycle.first(), cycle.last());
                assert_eq!(cycle.len(), 3);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let analyzer = DependencyAnalyzer::new();
        let mut a = create_test_task(TaskType::Analysis, 1);
        a.dependencies.insert(a.id);
        assert!(analyzer.detect_cycle(&[a]).is_some());
    }

    #[test]
    fn test_diamond_is_not_cycle() {
        let analyzer = DependencyAnalyzer::new();
        let root = create_test_task(TaskType::Analysis, 1);
        let mut left = create_test_task(TaskType::Analysis, 2);
        let mut right = create_test_task(TaskType::Analysis, 2);
        let mut sink = create_test_task(TaskType::Analysis, 3);
        left.dependencies.insert(root.id);
        right.dependencies.insert(root.id);
        sink.dependencies.extend([left.id, right.id]);

        assert!(analyzer.validate(&[sink, left, right, root]).is_ok());
    }

    #[test]
    fn test_topological_sort_simple() {
        let analyzer = DependencyAnalyzer::new();
        let t1 = create_test_task(TaskType::Analysis, 9);
        let mut t2 = create_test_task(TaskType::Analysis, 1);
        let mut t3 = create_test_task(TaskType::Analysis, 0);
        t2.dependencies.insert(t1.id);
        t3.dependencies.insert(t2.id);

        let sorted = analyzer
            .topological_sort(&[t3.clone(), t1.clone(), t2.clone()])
            .unwrap();
        assert_eq!(sorted, vec![t1.id, t2.id, t3.id]);
    }

    #[test]
    fn test_topological_sort_prefers_low_priority() {
        let analyzer = DependencyAnalyzer::new();
        let high = create_test_task(TaskType::Analysis, 10);
        let low = create_test_task(TaskType::Analysis, 1);

        let sorted = analyzer.topological_sort(&[high.clone(), low.clone()]).unwrap();
        assert_eq!(sorted, vec![low.id, high.id]);
    }

    #[test]
    fn test_dependency_depths() {
        let analyzer = DependencyAnalyzer::new();
        let t1 = create_test_task(TaskType::Analysis, 1);
        let mut t2 = create_test_task(TaskType::Analysis, 2);
        let mut t3 = create_test_task(TaskType::Analysis, 3);
        t2.dependencies.insert(t1.id);
        t3.dependencies.extend([t1.id, t2.id]);

        let depths = analyzer.dependency_depths(&[t1.clone(), t2.clone(), t3.clone()]);
        assert_eq!(depths[&t1.id], 0);
        assert_eq!(depths[&t2.id], 1);
        assert_eq!(depths[&t3.id], 2);
    }
}
