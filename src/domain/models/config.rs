use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for Tactician
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Plan construction settings
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Plan execution settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Planner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlannerConfig {
    /// Retry budget given to every decomposed task
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,
}

const fn default_max_retries() -> u32 {
    3
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_max_retries: default_max_retries(),
        }
    }
}

/// Execution engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Maximum tasks in flight within a parallelizable phase
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-attempt timeout when a strategy declares none (seconds)
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    /// Base delay before a retry attempt, doubled per retry (milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Minimum score a strategy must reach to be used (0.0-1.0)
    #[serde(default = "default_viability_threshold")]
    pub viability_threshold: f64,

    /// Number of attempts remembered for adaptive selection
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Fail dependent phases (rather than cancel them) after a structural failure
    #[serde(default = "default_true")]
    pub cascade_structural_failures: bool,
}

const fn default_max_concurrency() -> usize {
    4
}

const fn default_task_timeout_secs() -> u64 {
    300
}

const fn default_retry_backoff_ms() -> u64 {
    50
}

const fn default_viability_threshold() -> f64 {
    0.3
}

const fn default_history_capacity() -> usize {
    256
}

const fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            task_timeout_secs: default_task_timeout_secs(),
            retry_backoff_ms: default_retry_backoff_ms(),
            viability_threshold: default_viability_threshold(),
            history_capacity: default_history_capacity(),
            cascade_structural_failures: default_true(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Log file rotation policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log rotation policy for file output
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}
