//! Phase-by-phase plan execution.
//!
//! The engine owns a single coordinating loop per plan. Strategy calls run
//! as spawned tasks and hand their results back to the coordinator, which
//! is the only place task status, resource counters and history change.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinError;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::execution_report::{ExecutionEvent, ExecutionReport, TaskOutcome};
use crate::domain::errors::{DomainResult, ExecutionError};
use crate::domain::models::{
    AttemptOutcome, EngineConfig, ExecutionPhase, StrategyContext, StrategyOutput, Task,
    TaskSignature, TaskStatus, ValidationRule,
};
use crate::domain::ports::{ExecutionStrategy, PlanRepository};
use crate::services::{ExecutionHistory, ResourceDemand, ResourceState, StrategySelector};

/// Longest backoff exponent; keeps the doubling from overflowing.
const MAX_BACKOFF_SHIFT: u32 = 10;
/// Times a task is put back after its strategy reports exhausted
/// resources. Past this it counts as transient contention.
const MAX_RESOURCE_REQUEUES: u32 = 3;

/// What a spawned attempt hands back to the coordinator.
struct AttemptReport {
    result: Result<StrategyOutput, ExecutionError>,
    elapsed: Duration,
}

type AttemptFuture = BoxFuture<'static, (Uuid, Result<AttemptReport, JoinError>)>;

/// Bookkeeping for an attempt that has been dispatched.
struct InFlight {
    task: Task,
    demand: ResourceDemand,
    strategy: &'static str,
}

enum Dispatch {
    Started(AttemptFuture),
    Deferred,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseOutcome {
    Succeeded,
    /// A task failed structurally, here or in a cascading upstream phase
    Structural,
    Incomplete,
}

/// State of one plan run, owned by the coordinator.
struct PlanRun {
    plan_id: Uuid,
    resources: ResourceState,
    running: HashMap<Uuid, InFlight>,
    attempts: HashMap<Uuid, u32>,
    strategies: HashMap<Uuid, &'static str>,
    requeues: HashMap<Uuid, u32>,
    /// Serial task currently holding the phase
    exclusive: Option<Uuid>,
    structural_failure: bool,
}

/// Executes stored plans against a set of strategies.
pub struct ExecutionEngine<R: PlanRepository + ?Sized + 'static> {
    repo: Arc<R>,
    selector: Arc<StrategySelector>,
    config: EngineConfig,
    history: Arc<RwLock<ExecutionHistory>>,
    cancel_tx: watch::Sender<bool>,
}

impl<R: PlanRepository + ?Sized + 'static> ExecutionEngine<R> {
    pub fn new(repo: Arc<R>, selector: StrategySelector, config: EngineConfig) -> Self {
        let history = ExecutionHistory::new(config.history_capacity);
        let (cancel_tx, _) = watch::channel(false);
        Self {
            repo,
            selector: Arc::new(selector),
            config,
            history: Arc::new(RwLock::new(history)),
            cancel_tx,
        }
    }

    /// Seed selection with previously recorded attempts.
    pub fn with_history(mut self, history: ExecutionHistory) -> Self {
        self.history = Arc::new(RwLock::new(history));
        self
    }

    pub async fn history(&self) -> ExecutionHistory {
        self.history.read().await.clone()
    }

    /// Stop dispatching and cancel in-flight attempts of the running plan.
    /// Completed tasks are kept.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Execute a plan.
    pub async fn execute_plan(&self, plan_id: Uuid) -> DomainResult<ExecutionReport> {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        self.execute_plan_with_events(plan_id, tx).await
    }

    /// Execute a plan with event streaming.
    ///
    /// Events are best-effort: a closed receiver does not stop execution.
    /// The first poll clears any earlier cancellation; a `cancel` after
    /// that stops this run.
    #[instrument(skip_all, fields(plan_id = %plan_id))]
    pub async fn execute_plan_with_events(
        &self,
        plan_id: Uuid,
        events: mpsc::Sender<ExecutionEvent>,
    ) -> DomainResult<ExecutionReport> {
        self.cancel_tx.send_replace(false);
        let plan = self.repo.get_execution_plan(plan_id).await?;
        let started = Instant::now();

        info!(tasks = plan.task_ids.len(), phases = plan.phases.len(), "plan execution started");
        let _ = events
            .send(ExecutionEvent::PlanStarted {
                plan_id,
                total_tasks: plan.task_ids.len(),
                phase_count: plan.phases.len(),
            })
            .await;

        let mut run = PlanRun {
            plan_id,
            resources: ResourceState::for_plan(&plan),
            running: HashMap::new(),
            attempts: HashMap::new(),
            strategies: HashMap::new(),
            requeues: HashMap::new(),
            exclusive: None,
            structural_failure: false,
        };
        let mut outcomes: HashMap<Uuid, PhaseOutcome> = HashMap::new();

        for (index, phase) in plan.phases.iter().enumerate() {
            let number = index + 1;

            if self.is_cancelled() {
                self.skip_phase(phase, number, false, "plan cancelled", &events).await?;
                outcomes.insert(phase.id, PhaseOutcome::Incomplete);
                continue;
            }

            let blocked_by = phase
                .dependencies
                .iter()
                .find(|dep| outcomes.get(dep) != Some(&PhaseOutcome::Succeeded));
            if let Some(dep) = blocked_by {
                let upstream_structural = outcomes.get(dep) == Some(&PhaseOutcome::Structural);
                let cascade = upstream_structural && self.config.cascade_structural_failures;
                let dep_name = plan
                    .phases
                    .iter()
                    .find(|p| p.id == *dep)
                    .map_or("unknown", |p| p.name.as_str());
                let reason = format!("upstream {dep_name} did not succeed");
                self.skip_phase(phase, number, cascade, &reason, &events).await?;
                outcomes.insert(
                    phase.id,
                    if cascade {
                        PhaseOutcome::Structural
                    } else {
                        PhaseOutcome::Incomplete
                    },
                );
                continue;
            }

            let outcome = self.run_phase(&mut run, phase, number, &events).await?;
            outcomes.insert(phase.id, outcome);
        }

        let report = self.build_report(&run, started).await?;
        info!(
            status = %report.status(),
            completed = report.completed_count(),
            failed = report.failed_count(),
            cancelled = report.cancelled_count(),
            duration_ms = report.duration_ms,
            "plan execution finished"
        );
        let _ = events
            .send(ExecutionEvent::PlanCompleted {
                status: report.status(),
                success_rate: report.success_rate(),
            })
            .await;

        Ok(report)
    }

    /// Mark a phase's pending tasks as never run.
    async fn skip_phase(
        &self,
        phase: &ExecutionPhase,
        number: usize,
        cascade: bool,
        reason: &str,
        events: &mpsc::Sender<ExecutionEvent>,
    ) -> DomainResult<()> {
        if cascade {
            warn!(phase = number, reason, "phase cascade-failed");
        } else {
            info!(phase = number, reason, "phase skipped");
        }
        for &task_id in &phase.task_ids {
            let task = self.repo.get_task(task_id).await?;
            if task.status != TaskStatus::Pending {
                continue;
            }
            if cascade {
                self.repo
                    .update_task_status(task_id, TaskStatus::Failed, Some(reason.to_string()))
                    .await?;
            } else {
                self.repo
                    .update_task_status(task_id, TaskStatus::Cancelled, None)
                    .await?;
            }
        }
        let _ = events
            .send(ExecutionEvent::PhaseSkipped {
                phase: number,
                reason: reason.to_string(),
            })
            .await;
        Ok(())
    }

    async fn run_phase(
        &self,
        run: &mut PlanRun,
        phase: &ExecutionPhase,
        number: usize,
        events: &mpsc::Sender<ExecutionEvent>,
    ) -> DomainResult<PhaseOutcome> {
        let limit = if phase.parallelizable {
            self.config.max_concurrency.max(1)
        } else {
            1
        };
        info!(phase = number, tasks = phase.task_ids.len(), limit, "phase started");
        let _ = events
            .send(ExecutionEvent::PhaseStarted {
                phase: number,
                name: phase.name.clone(),
                task_count: phase.task_ids.len(),
            })
            .await;

        run.structural_failure = false;
        let mut cancel_rx = self.cancel_tx.subscribe();
        let mut queue: VecDeque<Uuid> = phase.task_ids.iter().copied().collect();
        let mut in_flight: FuturesUnordered<AttemptFuture> = FuturesUnordered::new();

        loop {
            let cancelled = *cancel_rx.borrow_and_update();

            if !cancelled {
                let mut deferred = Vec::new();
                while run.exclusive.is_none() && in_flight.len() < limit {
                    let Some(task_id) = queue.pop_front() else {
                        break;
                    };
                    let task = self.repo.get_task(task_id).await?;
                    if task.status != TaskStatus::Pending {
                        continue;
                    }
                    let serial = task.requires_serial_execution();
                    if serial && !in_flight.is_empty() {
                        queue.push_front(task_id);
                        break;
                    }
                    match self.dispatch(run, task, events).await? {
                        Dispatch::Started(attempt) => {
                            if serial {
                                run.exclusive = Some(task_id);
                            }
                            in_flight.push(attempt);
                        }
                        Dispatch::Deferred => deferred.push(task_id),
                        Dispatch::Failed => {}
                    }
                }
                for task_id in deferred.into_iter().rev() {
                    queue.push_front(task_id);
                }
            }

            if in_flight.is_empty() {
                if cancelled || queue.is_empty() {
                    break;
                }
                // Demand is clamped to the caps, so an idle engine can
                // always place a task. Fail rather than spin if not.
                self.fail_unplaceable(run, &mut queue, events).await?;
                break;
            }

            if cancelled {
                if let Some((task_id, joined)) = in_flight.next().await {
                    self.apply(run, task_id, joined, &mut queue, events).await?;
                }
                continue;
            }

            tokio::select! {
                next = in_flight.next() => {
                    if let Some((task_id, joined)) = next {
                        self.apply(run, task_id, joined, &mut queue, events).await?;
                    }
                }
                _ = cancel_rx.changed() => {}
            }
        }

        let mut succeeded = 0;
        let mut failed = 0;
        for &task_id in &phase.task_ids {
            let mut task = self.repo.get_task(task_id).await?;
            if task.status == TaskStatus::Pending && self.is_cancelled() {
                task = self
                    .repo
                    .update_task_status(task_id, TaskStatus::Cancelled, None)
                    .await?;
            }
            match task.status {
                TaskStatus::Completed => succeeded += 1,
                TaskStatus::Failed => failed += 1,
                _ => {}
            }
        }

        info!(phase = number, succeeded, failed, "phase finished");
        let _ = events
            .send(ExecutionEvent::PhaseCompleted {
                phase: number,
                succeeded,
                failed,
            })
            .await;

        Ok(if succeeded == phase.task_ids.len() {
            PhaseOutcome::Succeeded
        } else if run.structural_failure {
            PhaseOutcome::Structural
        } else {
            PhaseOutcome::Incomplete
        })
    }

    /// Select a strategy, reserve resources and spawn one attempt.
    async fn dispatch(
        &self,
        run: &mut PlanRun,
        task: Task,
        events: &mpsc::Sender<ExecutionEvent>,
    ) -> DomainResult<Dispatch> {
        let choice = {
            let history = self.history.read().await;
            self.selector.select(&task, &history)
        };
        let strategy = match choice {
            Ok(choice) => choice.strategy,
            Err(err) => {
                warn!(task_id = %task.id, error = %err, "no viable strategy");
                self.repo
                    .update_task_status(task.id, TaskStatus::Failed, Some(err.to_string()))
                    .await?;
                run.structural_failure = true;
                let _ = events
                    .send(ExecutionEvent::TaskFailed {
                        task_id: task.id,
                        error: err.to_string(),
                        attempts: run.attempts.get(&task.id).copied().unwrap_or(0),
                    })
                    .await;
                return Ok(Dispatch::Failed);
            }
        };

        let demand = run.resources.demand_for(&task);
        if let Err(err) = run.resources.try_reserve(demand) {
            debug!(task_id = %task.id, reason = %err, "task deferred");
            let _ = events
                .send(ExecutionEvent::TaskDeferred {
                    task_id: task.id,
                    reason: err.to_string(),
                })
                .await;
            return Ok(Dispatch::Deferred);
        }

        let task = match self
            .repo
            .update_task_status(task.id, TaskStatus::Running, None)
            .await
        {
            Ok(task) => task,
            Err(err) => {
                run.resources.release(demand);
                return Err(err.into());
            }
        };

        let counter = run.attempts.entry(task.id).or_insert(0);
        let attempt = *counter;
        *counter += 1;
        run.strategies.insert(task.id, strategy.name());

        debug!(task_id = %task.id, strategy = strategy.name(), attempt, "task started");
        let _ = events
            .send(ExecutionEvent::TaskStarted {
                task_id: task.id,
                title: task.title.clone(),
                strategy: strategy.name(),
                attempt,
            })
            .await;

        let context = StrategyContext {
            plan_id: run.plan_id,
            attempt,
            resources: run.resources.snapshot(),
        };
        let limit = strategy
            .timeout()
            .unwrap_or_else(|| Duration::from_secs(self.config.task_timeout_secs));
        let backoff = self.backoff(attempt);
        let cancel_rx = self.cancel_tx.subscribe();

        run.running.insert(
            task.id,
            InFlight {
                task: task.clone(),
                demand,
                strategy: strategy.name(),
            },
        );

        let task_id = task.id;
        let handle = tokio::spawn(run_attempt(
            Arc::clone(&strategy),
            task,
            context,
            limit,
            backoff,
            cancel_rx,
        ));
        Ok(Dispatch::Started(
            async move { (task_id, handle.await) }.boxed(),
        ))
    }

    /// Apply a finished attempt: release resources, record history and
    /// move the task to its next status.
    async fn apply(
        &self,
        run: &mut PlanRun,
        task_id: Uuid,
        joined: Result<AttemptReport, JoinError>,
        queue: &mut VecDeque<Uuid>,
        events: &mpsc::Sender<ExecutionEvent>,
    ) -> DomainResult<()> {
        let Some(flight) = run.running.remove(&task_id) else {
            return Ok(());
        };
        run.resources.release(flight.demand);
        if run.exclusive == Some(task_id) {
            run.exclusive = None;
        }
        let attempts = run.attempts.get(&task_id).copied().unwrap_or(0);

        let (result, elapsed) = match joined {
            Ok(report) => (report.result, report.elapsed),
            Err(err) => (
                Err(ExecutionError::structural(format!("strategy aborted: {err}"))),
                Duration::ZERO,
            ),
        };
        let result = result.and_then(|output| {
            validate_output(&flight.task, &output)?;
            Ok(output)
        });

        let result = match result {
            Err(err @ ExecutionError::ResourceExhausted { .. }) => {
                let requeues = {
                    let count = run.requeues.entry(task_id).or_insert(0);
                    *count += 1;
                    *count
                };
                if requeues <= MAX_RESOURCE_REQUEUES {
                    self.repo
                        .update_task_status(task_id, TaskStatus::Pending, None)
                        .await?;
                    debug!(task_id = %task_id, requeues, reason = %err, "task requeued");
                    let _ = events
                        .send(ExecutionEvent::TaskDeferred {
                            task_id,
                            reason: err.to_string(),
                        })
                        .await;
                    queue.push_back(task_id);
                    return Ok(());
                }
                Err(ExecutionError::contention(err.to_string()))
            }
            other => other,
        };

        let outcome = match &result {
            Ok(_) => AttemptOutcome::Success,
            Err(ExecutionError::Cancelled) => AttemptOutcome::Cancelled,
            Err(err) if err.is_retryable() => AttemptOutcome::TransientFailure,
            Err(_) => AttemptOutcome::StructuralFailure,
        };
        self.history.write().await.record(
            TaskSignature::of(&flight.task),
            flight.strategy,
            outcome,
            elapsed,
        );

        match result {
            Ok(_) => {
                self.repo
                    .update_task_status(task_id, TaskStatus::Completed, None)
                    .await?;
                debug!(task_id = %task_id, attempts, "task completed");
                let _ = events
                    .send(ExecutionEvent::TaskCompleted {
                        task_id,
                        strategy: flight.strategy,
                        attempts,
                    })
                    .await;
            }
            Err(ExecutionError::Cancelled) => {
                self.repo
                    .update_task_status(task_id, TaskStatus::Cancelled, None)
                    .await?;
            }
            Err(err) if err.is_retryable() => {
                let failed = self
                    .repo
                    .update_task_status(task_id, TaskStatus::Failed, Some(err.to_string()))
                    .await?;
                if failed.can_retry() {
                    let retried = self
                        .repo
                        .update_task_status(task_id, TaskStatus::Pending, None)
                        .await?;
                    warn!(
                        task_id = %task_id,
                        retry = retried.retry_count,
                        max_retries = retried.max_retries,
                        error = %err,
                        "retry scheduled"
                    );
                    let _ = events
                        .send(ExecutionEvent::TaskRetrying {
                            task_id,
                            retry: retried.retry_count,
                            max_retries: retried.max_retries,
                            error: err.to_string(),
                        })
                        .await;
                    queue.push_back(task_id);
                } else {
                    warn!(task_id = %task_id, attempts, error = %err, "task failed, retries exhausted");
                    let _ = events
                        .send(ExecutionEvent::TaskFailed {
                            task_id,
                            error: err.to_string(),
                            attempts,
                        })
                        .await;
                }
            }
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "task failed structurally");
                self.repo
                    .update_task_status(task_id, TaskStatus::Failed, Some(err.to_string()))
                    .await?;
                run.structural_failure = true;
                let _ = events
                    .send(ExecutionEvent::TaskFailed {
                        task_id,
                        error: err.to_string(),
                        attempts,
                    })
                    .await;
            }
        }
        Ok(())
    }

    async fn fail_unplaceable(
        &self,
        run: &mut PlanRun,
        queue: &mut VecDeque<Uuid>,
        events: &mpsc::Sender<ExecutionEvent>,
    ) -> DomainResult<()> {
        while let Some(task_id) = queue.pop_front() {
            let task = self.repo.get_task(task_id).await?;
            if task.status != TaskStatus::Pending {
                continue;
            }
            let demand = run.resources.demand_for(&task);
            let error = match run.resources.try_reserve(demand) {
                Err(err) => err.to_string(),
                Ok(()) => {
                    run.resources.release(demand);
                    "task could not be placed".to_string()
                }
            };
            warn!(task_id = %task_id, error = %error, "task cannot fit resource caps");
            self.repo
                .update_task_status(task_id, TaskStatus::Failed, Some(error.clone()))
                .await?;
            run.structural_failure = true;
            let _ = events
                .send(ExecutionEvent::TaskFailed {
                    task_id,
                    error,
                    attempts: 0,
                })
                .await;
        }
        Ok(())
    }

    async fn build_report(&self, run: &PlanRun, started: Instant) -> DomainResult<ExecutionReport> {
        let tasks = self.repo.list_tasks(run.plan_id).await?;
        let outcomes = tasks
            .into_iter()
            .map(|task| TaskOutcome {
                task_id: task.id,
                attempts: run.attempts.get(&task.id).copied().unwrap_or(0),
                strategy: run.strategies.get(&task.id).map(|s| (*s).to_string()),
                title: task.title,
                status: task.status,
                retry_count: task.retry_count,
                error: task.error,
            })
            .collect();

        Ok(ExecutionReport {
            plan_id: run.plan_id,
            cancelled: self.is_cancelled(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            outcomes,
        })
    }

    /// Delay before the given zero-based attempt: none for the first,
    /// then the base delay doubled per retry.
    fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let shift = (attempt - 1).min(MAX_BACKOFF_SHIFT);
        Duration::from_millis(self.config.retry_backoff_ms.saturating_mul(1 << shift))
    }
}

/// Run one attempt with its backoff, bounded by the timeout and raced
/// against plan cancellation.
async fn run_attempt(
    strategy: Arc<dyn ExecutionStrategy>,
    task: Task,
    context: StrategyContext,
    limit: Duration,
    backoff: Duration,
    mut cancel_rx: watch::Receiver<bool>,
) -> AttemptReport {
    // Timed from the end of the backoff
    let mut started: Option<Instant> = None;
    let result = {
        let work = async {
            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
            started = Some(Instant::now());
            match timeout(limit, strategy.execute(&task, &context)).await {
                Ok(result) => result,
                Err(_) => Err(ExecutionError::timeout(limit)),
            }
        };

        tokio::select! {
            result = work => result,
            () = cancelled(&mut cancel_rx) => Err(ExecutionError::Cancelled),
        }
    };
    AttemptReport {
        result,
        elapsed: started.map_or(Duration::ZERO, |at| at.elapsed()),
    }
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|flag| *flag).await.is_err() {
        // Engine dropped; nothing left to cancel on
        std::future::pending::<()>().await;
    }
}

fn validate_output(task: &Task, output: &StrategyOutput) -> Result<(), ExecutionError> {
    for rule in &task.validation {
        match rule {
            ValidationRule::NonEmptyOutput if output.summary.trim().is_empty() => {
                return Err(ExecutionError::structural("validation failed: empty output"));
            }
            ValidationRule::ProducesArtifact(name) if !output.artifacts.contains(name) => {
                return Err(ExecutionError::structural(format!(
                    "validation failed: missing artifact '{name}'"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPlanRepository;
    use crate::adapters::strategies::{ScriptedOutcome, ScriptedStrategy};
    use crate::application::execution_report::ExecutionStatus;
    use crate::domain::errors::RepositoryError;
    use crate::domain::models::{ExecutionPlan, PlannerConfig, TaskType};
    use async_trait::async_trait;
    use crate::services::TaskPlanner;

    fn engine_config() -> EngineConfig {
        EngineConfig {
            retry_backoff_ms: 1,
            ..EngineConfig::default()
        }
    }

    async fn plan_with(repo: &Arc<InMemoryPlanRepository>, tasks: Vec<Task>) -> Uuid {
        let planner = TaskPlanner::new(Arc::clone(repo), &PlannerConfig::default());
        planner
            .create_plan_from_tasks("test", "", tasks)
            .await
            .unwrap()
            .id
    }

    fn task(title: &str, task_type: TaskType, priority: u32) -> Task {
        let mut t = Task::new(title, "", task_type);
        t.priority = priority;
        t
    }

    #[tokio::test]
    async fn test_all_tasks_complete() {
        let repo = Arc::new(InMemoryPlanRepository::new());
        let plan_id = plan_with(
            &repo,
            vec![task("a", TaskType::Analysis, 1), task("b", TaskType::Testing, 5)],
        )
        .await;

        let strategy = Arc::new(ScriptedStrategy::new("scripted"));
        let selector = StrategySelector::new(0.3).with_strategy(strategy.clone());
        let engine = ExecutionEngine::new(Arc::clone(&repo), selector, engine_config());

        let report = engine.execute_plan(plan_id).await.unwrap();
        assert_eq!(report.status(), ExecutionStatus::Completed);
        assert!(report.outcomes.iter().all(|o| o.attempts == 1));
        assert_eq!(engine.history().await.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_output_fails_validation() {
        let repo = Arc::new(InMemoryPlanRepository::new());
        let mut checked = task("a", TaskType::Analysis, 1);
        checked.validation = vec![ValidationRule::NonEmptyOutput];
        let plan_id = plan_with(&repo, vec![checked]).await;

        let strategy =
            Arc::new(ScriptedStrategy::new("scripted").with_default_outcome(ScriptedOutcome::Empty));
        let selector = StrategySelector::new(0.3).with_strategy(strategy.clone());
        let engine = ExecutionEngine::new(Arc::clone(&repo), selector, engine_config());

        let report = engine.execute_plan(plan_id).await.unwrap();
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.error.as_deref().unwrap().contains("validation failed"));
        assert_eq!(strategy.attempts_for("a").await, 1);
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let repo = Arc::new(InMemoryPlanRepository::new());
        let plan_id = plan_with(&repo, vec![task("slow", TaskType::Analysis, 1)]).await;

        let strategy = Arc::new(
            ScriptedStrategy::new("scripted").with_timeout(Duration::from_millis(20)),
        );
        strategy.script("slow", [ScriptedOutcome::Hang]).await;
        let selector = StrategySelector::new(0.3).with_strategy(strategy.clone());
        let engine = ExecutionEngine::new(Arc::clone(&repo), selector, engine_config());

        let report = engine.execute_plan(plan_id).await.unwrap();
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.status, TaskStatus::Completed);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.retry_count, 1);
    }

    #[tokio::test]
    async fn test_no_viable_strategy_fails_fast() {
        let repo = Arc::new(InMemoryPlanRepository::new());
        let plan_id = plan_with(&repo, vec![task("docs", TaskType::Documentation, 1)]).await;

        let strategy = Arc::new(
            ScriptedStrategy::new("impl-only").with_types([TaskType::Implementation]),
        );
        let selector = StrategySelector::new(0.3).with_strategy(strategy.clone());
        let engine = ExecutionEngine::new(Arc::clone(&repo), selector, engine_config());

        let report = engine.execute_plan(plan_id).await.unwrap();
        assert_eq!(report.status(), ExecutionStatus::Failed);
        assert_eq!(report.outcomes[0].attempts, 0);
        assert!(report.outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("No viable strategy"));
        assert!(strategy.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_resources_requeue_without_retry() {
        let repo = Arc::new(InMemoryPlanRepository::new());
        let plan_id = plan_with(&repo, vec![task("big", TaskType::Analysis, 1)]).await;

        let strategy = Arc::new(ScriptedStrategy::new("scripted"));
        strategy.script("big", [ScriptedOutcome::Exhausted]).await;
        let selector = StrategySelector::new(0.3).with_strategy(strategy.clone());
        let engine = ExecutionEngine::new(Arc::clone(&repo), selector, engine_config());

        let report = engine.execute_plan(plan_id).await.unwrap();
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.status, TaskStatus::Completed);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.retry_count, 0);
        // Only the successful attempt counts against the strategy
        let history = engine.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries().next().unwrap().outcome, AttemptOutcome::Success);
    }

    #[tokio::test]
    async fn test_persistent_exhaustion_becomes_contention() {
        let repo = Arc::new(InMemoryPlanRepository::new());
        let mut big = task("big", TaskType::Analysis, 1);
        big.max_retries = 0;
        let plan_id = plan_with(&repo, vec![big]).await;

        let strategy = Arc::new(
            ScriptedStrategy::new("scripted").with_default_outcome(ScriptedOutcome::Exhausted),
        );
        let selector = StrategySelector::new(0.3).with_strategy(strategy.clone());
        let engine = ExecutionEngine::new(Arc::clone(&repo), selector, engine_config());

        let report = engine.execute_plan(plan_id).await.unwrap();
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(outcome.retry_count, 0);
        assert_eq!(outcome.attempts, MAX_RESOURCE_REQUEUES + 1);
        assert!(outcome.error.as_deref().unwrap().contains("exhausted"));
        let history = engine.history().await;
        assert_eq!(
            history.entries().map(|e| e.outcome).collect::<Vec<_>>(),
            vec![AttemptOutcome::TransientFailure]
        );
    }

    #[tokio::test]
    async fn test_history_duration_excludes_backoff() {
        let repo = Arc::new(InMemoryPlanRepository::new());
        let plan_id = plan_with(&repo, vec![task("flaky", TaskType::Analysis, 1)]).await;

        let strategy = Arc::new(ScriptedStrategy::new("scripted"));
        strategy
            .script("flaky", [ScriptedOutcome::Transient("blip".into())])
            .await;
        let selector = StrategySelector::new(0.3).with_strategy(strategy.clone());
        let config = EngineConfig {
            retry_backoff_ms: 200,
            ..EngineConfig::default()
        };
        let engine = ExecutionEngine::new(Arc::clone(&repo), selector, config);

        let started = Instant::now();
        let report = engine.execute_plan(plan_id).await.unwrap();
        assert_eq!(report.outcomes[0].status, TaskStatus::Completed);
        assert!(started.elapsed() >= Duration::from_millis(200));

        let history = engine.history().await;
        assert_eq!(history.len(), 2);
        assert!(history
            .entries()
            .all(|e| e.duration < Duration::from_millis(100)));
    }

    /// Forwards to the in-memory repository, yielding once on plan reads.
    struct YieldingRepo {
        inner: Arc<InMemoryPlanRepository>,
    }

    #[async_trait]
    impl PlanRepository for YieldingRepo {
        async fn insert_plan(&self, plan: &ExecutionPlan, tasks: &[Task]) -> Result<(), RepositoryError> {
            self.inner.insert_plan(plan, tasks).await
        }

        async fn get_execution_plan(&self, id: Uuid) -> Result<ExecutionPlan, RepositoryError> {
            tokio::task::yield_now().await;
            self.inner.get_execution_plan(id).await
        }

        async fn get_task(&self, id: Uuid) -> Result<Task, RepositoryError> {
            self.inner.get_task(id).await
        }

        async fn list_tasks(&self, plan_id: Uuid) -> Result<Vec<Task>, RepositoryError> {
            self.inner.list_tasks(plan_id).await
        }

        async fn update_task_status(
            &self,
            id: Uuid,
            status: TaskStatus,
            error: Option<String>,
        ) -> Result<Task, RepositoryError> {
            self.inner.update_task_status(id, status, error).await
        }
    }

    #[tokio::test]
    async fn test_cancel_after_run_started_is_kept() {
        let inner = Arc::new(InMemoryPlanRepository::new());
        let plan_id = plan_with(&inner, vec![task("a", TaskType::Analysis, 1)]).await;
        let repo = Arc::new(YieldingRepo {
            inner: Arc::clone(&inner),
        });

        let strategy = Arc::new(ScriptedStrategy::new("scripted"));
        let selector = StrategySelector::new(0.3).with_strategy(strategy.clone());
        let engine = ExecutionEngine::new(repo, selector, engine_config());

        let mut run = Box::pin(engine.execute_plan(plan_id));
        assert!(futures::poll!(run.as_mut()).is_pending());
        engine.cancel();
        let report = run.await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.outcomes[0].status, TaskStatus::Cancelled);
        assert!(strategy.calls().await.is_empty());
    }

    #[test]
    fn test_backoff_doubles() {
        let repo = Arc::new(InMemoryPlanRepository::new());
        let config = EngineConfig {
            retry_backoff_ms: 10,
            ..EngineConfig::default()
        };
        let engine = ExecutionEngine::new(repo, StrategySelector::new(0.3), config);
        assert_eq!(engine.backoff(0), Duration::ZERO);
        assert_eq!(engine.backoff(1), Duration::from_millis(10));
        assert_eq!(engine.backoff(3), Duration::from_millis(40));
    }

    #[test]
    fn test_validate_output_rules() {
        let mut task = Task::new("t", "", TaskType::Analysis);
        task.validation = vec![ValidationRule::ProducesArtifact("report.md".into())];
        let missing = StrategyOutput::new("done");
        assert!(validate_output(&task, &missing).unwrap_err().is_structural());
        let present = StrategyOutput::new("done").with_artifact("report.md");
        assert!(validate_output(&task, &present).is_ok());
    }
}
