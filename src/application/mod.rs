//! Application layer: plan execution.

pub mod execution_engine;
pub mod execution_report;

pub use execution_engine::ExecutionEngine;
pub use execution_report::{ExecutionEvent, ExecutionReport, ExecutionStatus, TaskOutcome};
