//! Live resource accounting against a plan's declared caps.

use tracing::trace;

use crate::domain::errors::ExecutionError;
use crate::domain::models::{ExecutionPlan, ResourceKind, ResourceSnapshot, Task};
use crate::services::resource_estimator::{CPU_PER_COMPLEXITY, MEMORY_MB_PER_COMPLEXITY};

const EPSILON: f64 = 1e-9;

/// Resources one task holds while running.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceDemand {
    pub cpu: f64,
    pub memory_mb: f64,
}

/// Tracks cpu and memory in use. A reservation that would exceed a cap is
/// refused so the caller can defer the task.
#[derive(Debug, Clone)]
pub struct ResourceState {
    cpu_cap: f64,
    memory_cap_mb: f64,
    cpu_used: f64,
    memory_used_mb: f64,
}

impl ResourceState {
    pub fn new(cpu_cap: f64, memory_cap_mb: f64) -> Self {
        Self {
            cpu_cap,
            memory_cap_mb,
            cpu_used: 0.0,
            memory_used_mb: 0.0,
        }
    }

    /// Caps taken from the plan. Undeclared resources are unbounded.
    pub fn for_plan(plan: &ExecutionPlan) -> Self {
        Self::new(
            plan.resource_cap(ResourceKind::Cpu).unwrap_or(f64::INFINITY),
            plan.resource_cap(ResourceKind::Memory).unwrap_or(f64::INFINITY),
        )
    }

    /// A task's demand, scaled from its complexity and clamped to the caps
    /// so that any single task can always run on an idle engine.
    pub fn demand_for(&self, task: &Task) -> ResourceDemand {
        let complexity = f64::from(task.estimated_complexity);
        ResourceDemand {
            cpu: (complexity * CPU_PER_COMPLEXITY).min(self.cpu_cap),
            memory_mb: (complexity * MEMORY_MB_PER_COMPLEXITY).min(self.memory_cap_mb),
        }
    }

    pub fn try_reserve(&mut self, demand: ResourceDemand) -> Result<(), ExecutionError> {
        let cpu_available = self.cpu_cap - self.cpu_used;
        if demand.cpu > cpu_available + EPSILON {
            return Err(ExecutionError::ResourceExhausted {
                resource: ResourceKind::Cpu,
                requested: demand.cpu,
                available: cpu_available.max(0.0),
            });
        }
        let memory_available = self.memory_cap_mb - self.memory_used_mb;
        if demand.memory_mb > memory_available + EPSILON {
            return Err(ExecutionError::ResourceExhausted {
                resource: ResourceKind::Memory,
                requested: demand.memory_mb,
                available: memory_available.max(0.0),
            });
        }

        self.cpu_used += demand.cpu;
        self.memory_used_mb += demand.memory_mb;
        trace!(cpu_used = self.cpu_used, memory_used_mb = self.memory_used_mb, "resources reserved");
        Ok(())
    }

    pub fn release(&mut self, demand: ResourceDemand) {
        self.cpu_used = (self.cpu_used - demand.cpu).max(0.0);
        self.memory_used_mb = (self.memory_used_mb - demand.memory_mb).max(0.0);
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            cpu_used: self.cpu_used,
            cpu_cap: self.cpu_cap,
            memory_used_mb: self.memory_used_mb,
            memory_cap_mb: self.memory_cap_mb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskType;

    #[test]
    fn test_reserve_and_release() {
        let mut state = ResourceState::new(1.0, 500.0);
        let demand = ResourceDemand { cpu: 0.6, memory_mb: 100.0 };

        state.try_reserve(demand).unwrap();
        let err = state.try_reserve(demand).unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::ResourceExhausted { resource: ResourceKind::Cpu, .. }
        ));

        state.release(demand);
        assert!(state.try_reserve(demand).is_ok());
    }

    #[test]
    fn test_memory_cap() {
        let mut state = ResourceState::new(10.0, 150.0);
        state.try_reserve(ResourceDemand { cpu: 0.1, memory_mb: 100.0 }).unwrap();
        let err = state
            .try_reserve(ResourceDemand { cpu: 0.1, memory_mb: 100.0 })
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::ResourceExhausted { resource: ResourceKind::Memory, .. }
        ));
    }

    #[test]
    fn test_demand_clamped_to_caps() {
        let state = ResourceState::new(0.5, 200.0);
        let task = Task::new("i", "", TaskType::Integration);
        let demand = state.demand_for(&task);
        assert!((demand.cpu - 0.5).abs() < f64::EPSILON);
        assert!((demand.memory_mb - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_float_accumulation_fits_exactly() {
        let mut state = ResourceState::new(0.3, 1000.0);
        let d = ResourceDemand { cpu: 0.1, memory_mb: 1.0 };
        for _ in 0..3 {
            state.try_reserve(d).unwrap();
        }
        assert!(state.try_reserve(d).is_err());
    }
}
