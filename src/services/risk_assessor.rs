//! Risk identification for a task set.

use uuid::Uuid;

use crate::domain::models::{
    Mitigation, Risk, RiskAssessment, RiskCategory, RiskLevel, Task,
};

/// Tasks with more dependencies than this carry a dependency risk.
const DEPENDENCY_RISK_THRESHOLD: usize = 3;

/// Flags high-risk tasks and heavily-dependent tasks, attaching a
/// monitoring mitigation to each risk.
#[derive(Debug, Clone, Default)]
pub struct RiskAssessor;

impl RiskAssessor {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, tasks: &[Task]) -> RiskAssessment {
        let mut risks = Vec::new();

        for task in tasks {
            if task.context.is_high_risk() {
                risks.push(Risk {
                    id: Uuid::new_v4(),
                    description: format!("High-risk task: {}", task.title),
                    probability: 0.3,
                    impact: 0.8,
                    severity: RiskLevel::High,
                    category: RiskCategory::Technical,
                    task_id: task.id,
                });
            }
            if task.dependencies.len() > DEPENDENCY_RISK_THRESHOLD {
                risks.push(Risk {
                    id: Uuid::new_v4(),
                    description: format!(
                        "Task '{}' has {} dependencies",
                        task.title,
                        task.dependencies.len()
                    ),
                    probability: 0.2,
                    impact: 0.6,
                    severity: RiskLevel::Medium,
                    category: RiskCategory::Dependency,
                    task_id: task.id,
                });
            }
        }

        let overall_risk = risks
            .iter()
            .map(|r| r.severity)
            .max()
            .unwrap_or(RiskLevel::Low);

        let mitigations = risks
            .iter()
            .map(|r| Mitigation {
                risk_id: r.id,
                strategy: "monitor".to_string(),
                description: format!("Monitor progress: {}", r.description),
                cost: 0.1,
                effectiveness: 0.7,
            })
            .collect();

        RiskAssessment {
            overall_risk,
            risks,
            mitigations,
        }
    }
}
