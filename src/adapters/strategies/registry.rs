//! Strategy registry.

use std::sync::Arc;

use crate::domain::ports::ExecutionStrategy;
use crate::services::StrategySelector;

use super::builtin::{CautiousStrategy, DirectStrategy, IncrementalStrategy};

/// Names of the built-in strategies, in registration order.
const BUILTIN: [&str; 3] = ["direct", "incremental", "cautious"];

/// Creates strategies by name and assembles selectors.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrategyRegistry;

impl StrategyRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn create(&self, name: &str) -> Option<Arc<dyn ExecutionStrategy>> {
        match name {
            "direct" => Some(Arc::new(DirectStrategy::new())),
            "incremental" => Some(Arc::new(IncrementalStrategy::new())),
            "cautious" => Some(Arc::new(CautiousStrategy::new())),
            _ => None,
        }
    }

    pub fn available(&self) -> Vec<&'static str> {
        BUILTIN.to_vec()
    }

    /// All built-in strategies.
    pub fn builtin(&self) -> Vec<Arc<dyn ExecutionStrategy>> {
        BUILTIN.iter().filter_map(|name| self.create(name)).collect()
    }

    /// A selector over the built-in strategies.
    pub fn selector(&self, viability_threshold: f64) -> StrategySelector {
        self.builtin()
            .into_iter()
            .fold(StrategySelector::new(viability_threshold), StrategySelector::with_strategy)
    }
}
