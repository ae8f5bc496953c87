//! Construction of default-filled task records.

use std::collections::BTreeSet;
use uuid::Uuid;

use crate::domain::models::{Task, TaskContext, TaskType, ValidationRule};

/// Description of a task before defaults are applied.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    pub priority: u32,
    pub complexity: Option<u8>,
    pub dependencies: BTreeSet<Uuid>,
    pub context: TaskContext,
    pub constraints: Vec<String>,
    pub validation: Option<Vec<ValidationRule>>,
    pub max_retries: Option<u32>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            task_type,
            priority: 50,
            complexity: None,
            dependencies: BTreeSet::new(),
            context: TaskContext::default(),
            constraints: Vec::new(),
            validation: None,
            max_retries: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Override the type's default complexity. Clamped to 1-10.
    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = Uuid>) -> Self {
        self.dependencies.extend(deps);
        self
    }

    pub fn with_context(mut self, context: TaskContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn with_validation(mut self, rules: Vec<ValidationRule>) -> Self {
        self.validation = Some(rules);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// Produces pending tasks with the default complexity table, retry budget
/// and validation rules filled in.
#[derive(Debug, Clone)]
pub struct TaskFactory {
    default_max_retries: u32,
}

impl Default for TaskFactory {
    fn default() -> Self {
        Self::new(3)
    }
}

impl TaskFactory {
    pub fn new(default_max_retries: u32) -> Self {
        Self {
            default_max_retries,
        }
    }

    pub fn create(&self, draft: TaskDraft) -> Task {
        let mut task = Task::new(draft.title, draft.description, draft.task_type);
        task.priority = draft.priority;
        task.estimated_complexity = draft
            .complexity
            .unwrap_or_else(|| draft.task_type.default_complexity())
            .clamp(1, 10);
        task.dependencies = draft.dependencies;
        task.context = draft.context;
        task.constraints = draft.constraints;
        task.validation = draft
            .validation
            .unwrap_or_else(|| vec![ValidationRule::NonEmptyOutput]);
        task.max_retries = draft.max_retries.unwrap_or(self.default_max_retries);
        task
    }
}
