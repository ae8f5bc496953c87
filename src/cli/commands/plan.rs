//! `tactician plan`: build and print an execution plan.

use anyhow::Result;
use comfy_table::Cell;
use serde::Serialize;
use std::sync::Arc;

use crate::adapters::memory::InMemoryPlanRepository;
use crate::cli::output::{output, risk_cell, short_id, table_with_header, truncate, CommandOutput};
use crate::cli::IntentArgs;
use crate::domain::models::{Config, ExecutionPlan, Task};
use crate::domain::ports::PlanRepository;
use crate::services::TaskPlanner;

#[derive(Debug, Serialize)]
pub struct PlanOutput {
    pub plan: ExecutionPlan,
    pub tasks: Vec<Task>,
}

impl PlanOutput {
    /// Phase table plus timeline, risk and resource summaries.
    pub fn render(&self) -> String {
        let plan = &self.plan;
        let mut lines = vec![
            format!("Plan: {} ({})", plan.title, plan.id),
            plan.description.clone(),
            format!(
                "{} tasks in {} phases, about {} minutes",
                self.tasks.len(),
                plan.phases.len(),
                plan.timeline.total_minutes()
            ),
        ];

        let mut table =
            table_with_header(&["Phase", "ID", "Task", "Type", "Priority", "Complexity", "Deps", "Risk"]);
        for (index, phase) in plan.phases.iter().enumerate() {
            for task_id in &phase.task_ids {
                let Some(task) = self.tasks.iter().find(|t| t.id == *task_id) else {
                    continue;
                };
                let phase_label = if phase.parallelizable {
                    format!("{} (parallel)", index + 1)
                } else {
                    (index + 1).to_string()
                };
                table.add_row(vec![
                    Cell::new(phase_label),
                    Cell::new(short_id(&task.id)),
                    Cell::new(truncate(&task.title, 48)),
                    Cell::new(task.task_type.as_str()),
                    Cell::new(task.priority),
                    Cell::new(task.estimated_complexity),
                    Cell::new(task.dependencies.len()),
                    risk_cell(task.context.risk_level),
                ]);
            }
        }
        lines.push(table.to_string());

        lines.push(format!("Overall risk: {}", plan.risk_assessment.overall_risk));
        for risk in &plan.risk_assessment.risks {
            lines.push(format!("  - [{}] {}", risk.severity, risk.description));
        }
        let resources: Vec<String> = plan
            .resources
            .iter()
            .map(|r| format!("{} {:.1} {}", r.kind, r.amount, r.unit))
            .collect();
        if !resources.is_empty() {
            lines.push(format!("Resources: {}", resources.join(", ")));
        }
        lines.push(format!(
            "Milestones: {}",
            plan.timeline
                .milestones
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        ));

        lines.join("\n")
    }
}

impl CommandOutput for PlanOutput {
    fn to_human(&self) -> String {
        self.render()
    }
}

pub async fn execute(args: IntentArgs, config: &Config, json_mode: bool) -> Result<()> {
    let intent = super::load_intent(&args)?;
    let repo = Arc::new(InMemoryPlanRepository::new());
    let planner = TaskPlanner::new(Arc::clone(&repo), &config.planner);

    let plan = planner.create_execution_plan(&intent).await?;
    let tasks = repo.list_tasks(plan.id).await?;

    output(&PlanOutput { plan, tasks }, json_mode);
    Ok(())
}
