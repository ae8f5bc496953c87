//! `tactician run`: plan an intent and execute it.

use anyhow::Result;
use comfy_table::Cell;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use crate::adapters::memory::InMemoryPlanRepository;
use crate::adapters::strategies::StrategyRegistry;
use crate::application::{ExecutionEngine, ExecutionEvent, ExecutionReport, ExecutionStatus};
use crate::cli::output::{output, short_id, status_cell, table_with_header, truncate, CommandOutput};
use crate::cli::IntentArgs;
use crate::domain::models::Config;
use crate::services::TaskPlanner;

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub plan_title: String,
    pub status: ExecutionStatus,
    pub success_rate: f64,
    pub report: ExecutionReport,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let mut table = table_with_header(&["ID", "Task", "Status", "Attempts", "Strategy", "Error"]);
        for outcome in &self.report.outcomes {
            table.add_row(vec![
                Cell::new(short_id(&outcome.task_id)),
                Cell::new(truncate(&outcome.title, 40)),
                status_cell(outcome.status),
                Cell::new(outcome.attempts),
                Cell::new(outcome.strategy.as_deref().unwrap_or("-")),
                Cell::new(truncate(outcome.error.as_deref().unwrap_or(""), 60)),
            ]);
        }

        let mut lines = vec![
            format!("Plan: {}", self.plan_title),
            table.to_string(),
            format!(
                "Status: {} ({:.0}% of tasks completed in {} ms)",
                self.status,
                self.success_rate * 100.0,
                self.report.duration_ms
            ),
        ];
        if self.report.cancelled {
            lines.push("Execution was cancelled.".to_string());
        }
        lines.join("\n")
    }
}

/// One progress line per event, or `None` for events not worth showing.
pub fn describe(event: &ExecutionEvent) -> Option<String> {
    match event {
        ExecutionEvent::PhaseStarted { phase, name, task_count } => {
            Some(format!("==> {name} ({phase}): {task_count} task(s)"))
        }
        ExecutionEvent::TaskStarted { title, strategy, attempt, .. } => {
            Some(format!("  -> {title} [{strategy}, attempt {}]", attempt + 1))
        }
        ExecutionEvent::TaskRetrying { task_id, retry, max_retries, error } => Some(format!(
            "  !! {} retry {retry}/{max_retries}: {error}",
            short_id(task_id)
        )),
        ExecutionEvent::TaskFailed { task_id, error, .. } => {
            Some(format!("  xx {} failed: {error}", short_id(task_id)))
        }
        ExecutionEvent::PhaseSkipped { phase, reason } => {
            Some(format!("==> phase {phase} skipped: {reason}"))
        }
        _ => None,
    }
}

pub async fn execute(args: IntentArgs, config: &Config, json_mode: bool) -> Result<()> {
    let intent = super::load_intent(&args)?;
    let repo = Arc::new(InMemoryPlanRepository::new());
    let planner = TaskPlanner::new(Arc::clone(&repo), &config.planner);
    let plan = planner.create_execution_plan(&intent).await?;

    let selector = StrategyRegistry::new().selector(config.engine.viability_threshold);
    let engine = ExecutionEngine::new(Arc::clone(&repo), selector, config.engine.clone());

    let (tx, mut rx) = mpsc::channel(64);
    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if json_mode {
                continue;
            }
            if let Some(line) = describe(&event) {
                eprintln!("{line}");
            }
        }
    });

    let run = engine.execute_plan_with_events(plan.id, tx);
    tokio::pin!(run);
    let report = tokio::select! {
        report = &mut run => report?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, cancelling plan");
            engine.cancel();
            run.await?
        }
    };
    let _ = progress.await;

    output(
        &RunOutput {
            plan_title: plan.title,
            status: report.status(),
            success_rate: report.success_rate(),
            report,
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_describe_selected_events() {
        let started = ExecutionEvent::TaskStarted {
            task_id: Uuid::new_v4(),
            title: "Analyze".into(),
            strategy: "direct",
            attempt: 0,
        };
        assert_eq!(describe(&started).unwrap(), "  -> Analyze [direct, attempt 1]");

        let deferred = ExecutionEvent::TaskDeferred {
            task_id: Uuid::new_v4(),
            reason: "cpu".into(),
        };
        assert!(describe(&deferred).is_none());
    }
}
