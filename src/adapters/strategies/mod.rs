//! Execution strategy implementations.

pub mod builtin;
pub mod registry;
pub mod scripted;

pub use builtin::{CautiousStrategy, DirectStrategy, IncrementalStrategy};
pub use registry::StrategyRegistry;
pub use scripted::{ScriptedCall, ScriptedOutcome, ScriptedStrategy};
