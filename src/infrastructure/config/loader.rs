use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project directory holding configuration files.
pub const CONFIG_DIR: &str = ".tactician";

/// Prefix for environment overrides. Nested keys are split on `__`.
pub const ENV_PREFIX: &str = "TACTICIAN_";

/// Configuration error types
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid max_concurrency: {0}. Must be at least 1")]
    InvalidMaxConcurrency(usize),

    #[error("Invalid task_timeout_secs: {0}. Must be at least 1")]
    InvalidTaskTimeout(u64),

    #[error("Invalid viability_threshold: {0}. Must be between 0.0 and 1.0")]
    InvalidViabilityThreshold(f64),

    #[error("Invalid history_capacity: {0}. Must be at least 1")]
    InvalidHistoryCapacity(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .tactician/config.yaml (project config)
    /// 3. .tactician/local.yaml (project local overrides, optional)
    /// 4. Environment variables (TACTICIAN_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Load configuration rooted at `root` instead of the current directory
    pub fn load_from_dir(root: impl AsRef<Path>) -> Result<Config> {
        let dir = root.as_ref().join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let engine = &config.engine;
        if engine.max_concurrency == 0 {
            return Err(ConfigError::InvalidMaxConcurrency(engine.max_concurrency));
        }

        if engine.task_timeout_secs == 0 {
            return Err(ConfigError::InvalidTaskTimeout(engine.task_timeout_secs));
        }

        if !(0.0..=1.0).contains(&engine.viability_threshold) {
            return Err(ConfigError::InvalidViabilityThreshold(
                engine.viability_threshold,
            ));
        }

        if engine.history_capacity == 0 {
            return Err(ConfigError::InvalidHistoryCapacity(engine.history_capacity));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}
