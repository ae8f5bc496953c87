//! Turns a classified intent into a validated, phased and annotated plan.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::errors::{DomainResult, PlanningError};
use crate::domain::models::{
    ExecutionPlan, Impact, Intent, IntentKind, PlannerConfig, RiskLevel, Scope, Task, TaskContext,
    TaskType,
};
use crate::domain::ports::PlanRepository;
use crate::services::{
    DependencyAnalyzer, PhaseGrouper, ResourceEstimator, RiskAssessor, TaskDraft, TaskFactory,
    TimelineEstimator,
};

/// Priority of the context-initialization task that opens every plan.
pub const SETUP_PRIORITY: u32 = 0;
/// Priority of the completion-validation task that closes every plan.
pub const VALIDATION_PRIORITY: u32 = 100;
/// Gap between consecutive decomposed tasks. Keeps chained steps out of
/// each other's grouping window.
const PRIORITY_STEP: u32 = 10;

/// More referenced files than this widens scope to the module.
const MODULE_SCOPE_FILE_COUNT: usize = 3;

/// Orchestrates decomposition, dependency analysis, phase grouping and
/// plan annotation, and stores the result in the repository.
pub struct TaskPlanner<R>
where
    R: PlanRepository + ?Sized,
{
    repo: Arc<R>,
    factory: TaskFactory,
    analyzer: DependencyAnalyzer,
    grouper: PhaseGrouper,
    timeline: TimelineEstimator,
    risk: RiskAssessor,
    resources: ResourceEstimator,
}

impl<R> TaskPlanner<R>
where
    R: PlanRepository + ?Sized,
{
    pub fn new(repo: Arc<R>, config: &PlannerConfig) -> Self {
        Self {
            repo,
            factory: TaskFactory::new(config.default_max_retries),
            analyzer: DependencyAnalyzer::new(),
            grouper: PhaseGrouper::new(),
            timeline: TimelineEstimator::new(),
            risk: RiskAssessor::new(),
            resources: ResourceEstimator::new(),
        }
    }

    /// Plan an intent and store the plan with its tasks.
    #[instrument(skip(self, intent), fields(kind = ?intent.kind))]
    pub async fn create_execution_plan(&self, intent: &Intent) -> DomainResult<ExecutionPlan> {
        let (plan, tasks) = self.build_plan(intent)?;
        self.repo.insert_plan(&plan, &tasks).await?;
        Ok(plan)
    }

    /// Plan an explicit task set and store the result.
    pub async fn create_plan_from_tasks(
        &self,
        title: &str,
        description: &str,
        tasks: Vec<Task>,
    ) -> DomainResult<ExecutionPlan> {
        let (plan, tasks) = self.assemble(title, description, tasks)?;
        self.repo.insert_plan(&plan, &tasks).await?;
        Ok(plan)
    }

    pub async fn get_execution_plan(&self, id: Uuid) -> DomainResult<ExecutionPlan> {
        Ok(self.repo.get_execution_plan(id).await?)
    }

    pub async fn get_task(&self, id: Uuid) -> DomainResult<Task> {
        Ok(self.repo.get_task(id).await?)
    }

    /// Build a plan without storing it.
    pub fn build_plan(&self, intent: &Intent) -> Result<(ExecutionPlan, Vec<Task>), PlanningError> {
        if intent.action.trim().is_empty() {
            return Err(PlanningError::InvalidIntent("action is empty".to_string()));
        }

        let domain_tasks = self.decompose(intent);
        if domain_tasks.is_empty() {
            return Err(PlanningError::NoTasks);
        }

        let tasks = self.bracket(intent, domain_tasks);
        let description = format!(
            "{} plan for '{}' ({:?} complexity{})",
            kind_label(intent.kind),
            intent.action,
            intent.complexity,
            if intent.multi_step { ", multi-step" } else { "" }
        );
        self.assemble(&intent.action, &description, tasks)
    }

    /// Split an intent into its domain tasks, each depending on its
    /// predecessor.
    pub fn decompose(&self, intent: &Intent) -> Vec<Task> {
        let context = context_for(intent);
        let action = intent.action.trim();
        let mut chain = Chain::new(&self.factory, context, constraints_for(intent));

        match intent.kind {
            IntentKind::TaskRequest => {
                chain.push(
                    format!("Analyze requirements: {action}"),
                    "Review the request, the affected code and its constraints",
                    TaskType::Analysis,
                );
                if intent.implies_construction() {
                    chain.push(
                        "Design solution",
                        "Decide structure, interfaces and data flow",
                        TaskType::Analysis,
                    );
                    chain.push(
                        format!("Implement: {action}"),
                        "Write the code for the designed solution",
                        TaskType::Implementation,
                    );
                    chain.push(
                        "Add error handling",
                        "Handle failure paths and edge cases",
                        TaskType::Implementation,
                    );
                }
                chain.push(
                    "Write and run tests",
                    "Cover the change with tests and run them",
                    TaskType::Testing,
                );
                if intent.complexity.is_demanding() || intent.multi_step {
                    chain.push(
                        "Update documentation",
                        "Document the change for users and maintainers",
                        TaskType::Documentation,
                    );
                }
            }
            IntentKind::Question => {
                chain.push(
                    format!("Research: {action}"),
                    "Gather the relevant code, docs and context",
                    TaskType::Analysis,
                );
                chain.push(
                    "Analyze findings",
                    "Synthesize the research into an answer",
                    TaskType::Analysis,
                );
            }
            IntentKind::Command => {
                chain.push(
                    format!("Validate command: {action}"),
                    "Check preconditions and arguments before running",
                    TaskType::Analysis,
                );
                chain.push(
                    format!("Execute command: {action}"),
                    "Run the command and capture its result",
                    TaskType::Implementation,
                );
            }
            IntentKind::Other => {
                chain.push(
                    format!("Handle request: {action}"),
                    "Respond to the request",
                    TaskType::Analysis,
                );
            }
        }

        chain.tasks
    }

    /// Open the plan with a context-initialization task and close it with
    /// a completion-validation task.
    fn bracket(&self, intent: &Intent, mut domain: Vec<Task>) -> Vec<Task> {
        let context = context_for(intent);

        let setup = self.factory.create(
            TaskDraft::new("Initialize context", TaskType::Analysis)
                .with_description("Load project context and working state")
                .with_priority(SETUP_PRIORITY)
                .with_context(context.clone()),
        );

        for task in domain.iter_mut().filter(|t| t.dependencies.is_empty()) {
            task.dependencies.insert(setup.id);
        }

        let depended_on: HashSet<Uuid> = domain
            .iter()
            .flat_map(|t| t.dependencies.iter().copied())
            .collect();
        let sinks: Vec<Uuid> = domain
            .iter()
            .filter(|t| !depended_on.contains(&t.id))
            .map(|t| t.id)
            .collect();

        let validate = self.factory.create(
            TaskDraft::new("Validate completion", TaskType::Testing)
                .with_description("Confirm the request has been fully satisfied")
                .with_priority(VALIDATION_PRIORITY)
                .with_dependencies(sinks)
                .with_context(context),
        );

        let mut tasks = Vec::with_capacity(domain.len() + 2);
        tasks.push(setup);
        tasks.extend(domain);
        tasks.push(validate);
        tasks
    }

    /// Analyze, validate, group and annotate a task set.
    pub fn assemble(
        &self,
        title: &str,
        description: &str,
        mut tasks: Vec<Task>,
    ) -> Result<(ExecutionPlan, Vec<Task>), PlanningError> {
        if tasks.is_empty() {
            return Err(PlanningError::NoTasks);
        }

        self.analyzer.add_implicit_dependencies(&mut tasks);
        self.analyzer.validate(&tasks)?;

        let order = self.analyzer.topological_sort(&tasks)?;
        let position: HashMap<Uuid, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        tasks.sort_by_key(|t| position.get(&t.id).copied().unwrap_or(usize::MAX));

        let phases = self.grouper.group(&tasks);
        let created_at = Utc::now();
        let timeline = self.timeline.estimate(created_at, &tasks, &phases);
        let risk_assessment = self.risk.assess(&tasks);
        let resources = self.resources.estimate(&tasks);

        let plan = ExecutionPlan {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            task_ids: order,
            phases,
            timeline,
            resources,
            risk_assessment,
            created_at,
        };

        info!(
            plan_id = %plan.id,
            tasks = plan.task_ids.len(),
            phases = plan.phases.len(),
            overall_risk = %plan.risk_assessment.overall_risk,
            "execution plan created"
        );

        Ok((plan, tasks))
    }
}

/// Builds a linear chain of tasks with increasing priority.
struct Chain<'a> {
    factory: &'a TaskFactory,
    context: TaskContext,
    constraints: Vec<String>,
    tasks: Vec<Task>,
}

impl<'a> Chain<'a> {
    fn new(factory: &'a TaskFactory, context: TaskContext, constraints: Vec<String>) -> Self {
        Self {
            factory,
            context,
            constraints,
            tasks: Vec::new(),
        }
    }

    fn push(&mut self, title: impl Into<String>, description: &str, task_type: TaskType) {
        let priority = PRIORITY_STEP * (self.tasks.len() as u32 + 1);
        let draft = TaskDraft::new(title, task_type)
            .with_description(description)
            .with_priority(priority)
            .with_context(self.context.clone())
            .with_dependencies(self.tasks.last().map(|t| t.id));
        let draft = self
            .constraints
            .iter()
            .fold(draft, |draft, c| draft.with_constraint(c.clone()));
        self.tasks.push(self.factory.create(draft));
    }
}

/// Limits every domain task of the intent has to respect.
fn constraints_for(intent: &Intent) -> Vec<String> {
    let mut constraints = Vec::new();
    if intent.kind == IntentKind::Question {
        constraints.push("read-only: leave files unchanged".to_string());
    } else if !intent.entities.files.is_empty() {
        constraints.push(format!(
            "limit changes to: {}",
            intent.entities.files.join(", ")
        ));
    }
    if intent.kind != IntentKind::Question && intent.risk_level == RiskLevel::High {
        constraints.push("review changes before applying them".to_string());
    }
    constraints
}

fn context_for(intent: &Intent) -> TaskContext {
    let risk_level = match intent.kind {
        IntentKind::Question => RiskLevel::Low,
        _ => intent.risk_level,
    };
    let broad = intent.multi_step || intent.complexity.is_demanding();

    let scope = if broad {
        Scope::Global
    } else if intent.entities.files.len() > MODULE_SCOPE_FILE_COUNT {
        Scope::Module
    } else {
        Scope::Local
    };

    let impact = if risk_level == RiskLevel::High {
        Impact::Significant
    } else if broad {
        Impact::Moderate
    } else {
        Impact::Minimal
    };

    TaskContext {
        areas: intent
            .entities
            .technologies
            .iter()
            .chain(&intent.entities.concepts)
            .cloned()
            .collect(),
        files: intent.entities.files.clone(),
        risk_level,
        scope,
        impact,
    }
}

fn kind_label(kind: IntentKind) -> &'static str {
    match kind {
        IntentKind::TaskRequest => "Task",
        IntentKind::Question => "Research",
        IntentKind::Command => "Command",
        IntentKind::Other => "General",
    }
}
