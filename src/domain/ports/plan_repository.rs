use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::RepositoryError;
use crate::domain::models::{ExecutionPlan, Task, TaskStatus};

/// Repository port for plans and the tasks they own.
///
/// Tasks are never deleted; terminal tasks stay queryable for audit.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Store a plan together with its tasks
    async fn insert_plan(&self, plan: &ExecutionPlan, tasks: &[Task]) -> Result<(), RepositoryError>;

    /// Get a plan by ID
    async fn get_execution_plan(&self, id: Uuid) -> Result<ExecutionPlan, RepositoryError>;

    /// Get a task by ID
    async fn get_task(&self, id: Uuid) -> Result<Task, RepositoryError>;

    /// List a plan's tasks in plan order
    async fn list_tasks(&self, plan_id: Uuid) -> Result<Vec<Task>, RepositoryError>;

    /// Move a task to a new status, recording an error message if given.
    ///
    /// This is the only mutation entry point for tasks after creation.
    /// `Failed -> Pending` consumes one retry.
    async fn update_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        error: Option<String>,
    ) -> Result<Task, RepositoryError>;
}
