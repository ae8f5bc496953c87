//! Scored dispatch over the registered execution strategies.

use std::sync::Arc;
use tracing::debug;

use crate::domain::errors::ExecutionError;
use crate::domain::models::{Task, TaskSignature};
use crate::domain::ports::ExecutionStrategy;
use crate::services::ExecutionHistory;

/// Weight of the historical success rate once samples exist.
const HISTORY_WEIGHT: f64 = 0.4;

const SCORE_EPSILON: f64 = 1e-9;

/// The chosen strategy and the score it won with.
#[derive(Clone)]
pub struct StrategyChoice {
    pub strategy: Arc<dyn ExecutionStrategy>,
    pub score: f64,
}

impl std::fmt::Debug for StrategyChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyChoice")
            .field("strategy", &self.strategy.name())
            .field("score", &self.score)
            .finish()
    }
}

/// Picks a strategy per task.
///
/// Only strategies whose capabilities cover the task type compete. A
/// strategy's score is its declared suitability, blended with its success
/// rate on tasks of the same signature when history has samples. Equal
/// scores go to the strategy with the most recent success, then to the
/// earliest registered.
#[derive(Clone)]
pub struct StrategySelector {
    strategies: Vec<Arc<dyn ExecutionStrategy>>,
    viability_threshold: f64,
}

impl StrategySelector {
    pub fn new(viability_threshold: f64) -> Self {
        Self {
            strategies: Vec::new(),
            viability_threshold,
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn ExecutionStrategy>) -> Self {
        self.register(strategy);
        self
    }

    pub fn register(&mut self, strategy: Arc<dyn ExecutionStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn viability_threshold(&self) -> f64 {
        self.viability_threshold
    }

    /// Score one strategy for a task. `None` if the strategy cannot run
    /// the task type at all.
    pub fn score(
        &self,
        strategy: &dyn ExecutionStrategy,
        task: &Task,
        history: &ExecutionHistory,
    ) -> Option<f64> {
        if !strategy.capabilities().supports(task.task_type) {
            return None;
        }
        let suitability = strategy.suitability(task).clamp(0.0, 1.0);
        let score = match history.success_rate(TaskSignature::of(task), strategy.name()) {
            Some(rate) => (1.0 - HISTORY_WEIGHT) * suitability + HISTORY_WEIGHT * rate,
            None => suitability,
        };
        Some(score)
    }

    pub fn select(
        &self,
        task: &Task,
        history: &ExecutionHistory,
    ) -> Result<StrategyChoice, ExecutionError> {
        let signature = TaskSignature::of(task);
        let mut best: Option<(StrategyChoice, Option<u64>)> = None;

        for strategy in &self.strategies {
            let Some(score) = self.score(strategy.as_ref(), task, history) else {
                continue;
            };
            let last_success = history.last_success(signature, strategy.name());

            let better = match &best {
                None => true,
                Some((current, current_success)) => {
                    if (score - current.score).abs() <= SCORE_EPSILON {
                        // Option ordering puts None below any Some
                        last_success > *current_success
                    } else {
                        score > current.score
                    }
                }
            };
            if better {
                best = Some((
                    StrategyChoice {
                        strategy: Arc::clone(strategy),
                        score,
                    },
                    last_success,
                ));
            }
        }

        match best {
            Some((choice, _)) if choice.score + SCORE_EPSILON >= self.viability_threshold => {
                debug!(
                    task_id = %task.id,
                    strategy = choice.strategy.name(),
                    score = choice.score,
                    "strategy selected"
                );
                Ok(choice)
            }
            other => Err(ExecutionError::NoViableStrategy {
                task_id: task.id,
                best_score: other.map_or(0.0, |(c, _)| c.score),
            }),
        }
    }
}
