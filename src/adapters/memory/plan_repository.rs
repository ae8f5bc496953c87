//! In-memory implementation of PlanRepository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::trace;
use uuid::Uuid;

use crate::domain::errors::RepositoryError;
use crate::domain::models::{ExecutionPlan, Task, TaskStatus};
use crate::domain::ports::PlanRepository;

#[derive(Default)]
struct Store {
    plans: HashMap<Uuid, ExecutionPlan>,
    tasks: HashMap<Uuid, Task>,
}

/// Keyed arenas for plans and tasks behind a single lock, so a status
/// update is observed atomically by every reader.
#[derive(Default)]
pub struct InMemoryPlanRepository {
    store: RwLock<Store>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn plan_count(&self) -> usize {
        self.store.read().await.plans.len()
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn insert_plan(&self, plan: &ExecutionPlan, tasks: &[Task]) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        for task in tasks {
            store.tasks.insert(task.id, task.clone());
        }
        store.plans.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn get_execution_plan(&self, id: Uuid) -> Result<ExecutionPlan, RepositoryError> {
        self.store
            .read()
            .await
            .plans
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::PlanNotFound(id))
    }

    async fn get_task(&self, id: Uuid) -> Result<Task, RepositoryError> {
        self.store
            .read()
            .await
            .tasks
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::TaskNotFound(id))
    }

    async fn list_tasks(&self, plan_id: Uuid) -> Result<Vec<Task>, RepositoryError> {
        let store = self.store.read().await;
        let plan = store
            .plans
            .get(&plan_id)
            .ok_or(RepositoryError::PlanNotFound(plan_id))?;
        plan.task_ids
            .iter()
            .map(|id| {
                store
                    .tasks
                    .get(id)
                    .cloned()
                    .ok_or(RepositoryError::TaskNotFound(*id))
            })
            .collect()
    }

    async fn update_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        error: Option<String>,
    ) -> Result<Task, RepositoryError> {
        let mut store = self.store.write().await;
        let task = store
            .tasks
            .get_mut(&id)
            .ok_or(RepositoryError::TaskNotFound(id))?;

        let from = task.status;
        task.transition_to(status)
            .map_err(|reason| RepositoryError::InvalidTransition {
                task_id: id,
                from,
                to: status,
                reason,
            })?;
        if error.is_some() {
            task.error = error;
        }

        trace!(task_id = %id, %from, to = %status, "task status updated");
        Ok(task.clone())
    }
}
