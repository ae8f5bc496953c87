//! Scripted strategy for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::errors::ExecutionError;
use crate::domain::models::{ResourceKind, StrategyContext, StrategyOutput, Task, TaskType};
use crate::domain::ports::{ExecutionStrategy, StrategyCapabilities};

/// What the next attempt on a task should do.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedOutcome {
    /// Succeed with the given summary
    Succeed(String),
    /// Succeed with an empty summary (fails the non-empty validation rule)
    Empty,
    /// Fail with a transient error
    Transient(String),
    /// Fail with a structural error
    Structural(String),
    /// Report that the attempt needs more memory than is available
    Exhausted,
    /// Never finish; only a timeout or cancellation ends the attempt
    Hang,
}

/// One recorded call to `execute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedCall {
    pub task_id: Uuid,
    pub title: String,
    pub attempt: u32,
}

/// Strategy that replays a queue of outcomes per task title.
///
/// Titles with no queued outcome fall back to the default outcome.
pub struct ScriptedStrategy {
    name: &'static str,
    capabilities: StrategyCapabilities,
    suitability: f64,
    timeout: Option<Duration>,
    delay: Duration,
    default_outcome: ScriptedOutcome,
    scripts: Mutex<HashMap<String, VecDeque<ScriptedOutcome>>>,
    calls: Mutex<Vec<ScriptedCall>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedStrategy {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            capabilities: StrategyCapabilities::all(),
            suitability: 0.8,
            timeout: None,
            delay: Duration::ZERO,
            default_outcome: ScriptedOutcome::Succeed("scripted success".to_string()),
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_suitability(mut self, suitability: f64) -> Self {
        self.suitability = suitability;
        self
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = TaskType>) -> Self {
        self.capabilities = StrategyCapabilities::new(types);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Hold every attempt for `delay` before resolving.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_default_outcome(mut self, outcome: ScriptedOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Queue outcomes for the task with this title.
    pub async fn script(
        &self,
        title: impl Into<String>,
        outcomes: impl IntoIterator<Item = ScriptedOutcome>,
    ) {
        let mut scripts = self.scripts.lock().await;
        scripts.entry(title.into()).or_default().extend(outcomes);
    }

    pub async fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn attempts_for(&self, title: &str) -> usize {
        self.calls.lock().await.iter().filter(|c| c.title == title).count()
    }

    /// Highest number of attempts observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn next_outcome(&self, title: &str) -> ScriptedOutcome {
        let mut scripts = self.scripts.lock().await;
        scripts
            .get_mut(title)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.default_outcome.clone())
    }
}

/// Counts an attempt as in flight until dropped, including when the
/// attempt future is abandoned on timeout or cancellation.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExecutionStrategy for ScriptedStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn capabilities(&self) -> StrategyCapabilities {
        self.capabilities.clone()
    }

    fn suitability(&self, _task: &Task) -> f64 {
        self.suitability
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn execute(
        &self,
        task: &Task,
        context: &StrategyContext,
    ) -> Result<StrategyOutput, ExecutionError> {
        let _guard = InFlight::enter(&self.in_flight, &self.peak_in_flight);
        self.calls.lock().await.push(ScriptedCall {
            task_id: task.id,
            title: task.title.clone(),
            attempt: context.attempt,
        });
        let outcome = self.next_outcome(&task.title).await;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match outcome {
            ScriptedOutcome::Succeed(summary) => Ok(StrategyOutput::new(summary)),
            ScriptedOutcome::Empty => Ok(StrategyOutput::default()),
            ScriptedOutcome::Transient(message) => Err(ExecutionError::transient(message)),
            ScriptedOutcome::Structural(message) => Err(ExecutionError::structural(message)),
            ScriptedOutcome::Exhausted => Err(ExecutionError::ResourceExhausted {
                resource: ResourceKind::Memory,
                requested: context.resources.memory_cap_mb + 100.0,
                available: context.resources.memory_available_mb(),
            }),
            ScriptedOutcome::Hang => {
                std::future::pending::<()>().await;
                Err(ExecutionError::Cancelled)
            }
        }
    }
}
