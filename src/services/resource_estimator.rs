use crate::domain::models::{ResourceKind, ResourceRequirement, Task};
use crate::services::phase_grouper::MINUTES_PER_COMPLEXITY;

/// CPU cores per complexity point
pub const CPU_PER_COMPLEXITY: f64 = 0.1;
/// Upper bound on the declared CPU cap
pub const MAX_CPU_CORES: f64 = 1.0;
/// Megabytes per complexity point
pub const MEMORY_MB_PER_COMPLEXITY: f64 = 50.0;
/// Upper bound on the declared memory cap
pub const MAX_MEMORY_MB: f64 = 500.0;

/// Derives a plan's resource caps from total task complexity.
#[derive(Debug, Clone, Default)]
pub struct ResourceEstimator;

impl ResourceEstimator {
    pub fn new() -> Self {
        Self
    }

    pub fn estimate(&self, tasks: &[Task]) -> Vec<ResourceRequirement> {
        let total: u64 = tasks.iter().map(|t| u64::from(t.estimated_complexity)).sum();
        let duration_minutes = total * MINUTES_PER_COMPLEXITY;

        vec![
            ResourceRequirement {
                kind: ResourceKind::Cpu,
                amount: (total as f64 * CPU_PER_COMPLEXITY).min(MAX_CPU_CORES),
                unit: ResourceKind::Cpu.unit().to_string(),
                duration_minutes,
            },
            ResourceRequirement {
                kind: ResourceKind::Memory,
                amount: (total as f64 * MEMORY_MB_PER_COMPLEXITY).min(MAX_MEMORY_MB),
                unit: ResourceKind::Memory.unit().to_string(),
                duration_minutes,
            },
        ]
    }
}
