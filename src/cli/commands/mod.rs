//! Command implementations.

pub mod plan;
pub mod run;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use crate::cli::IntentArgs;
use crate::domain::models::{Config, Intent};
use crate::infrastructure::ConfigLoader;

/// Load configuration from an explicit file, or the project hierarchy.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Build the intent from a file or from the command-line flags.
pub fn load_intent(args: &IntentArgs) -> Result<Intent> {
    let path = Path::new(&args.input);
    if path.is_file() {
        return read_intent_file(path);
    }

    let intent = Intent::new(parse_value("kind", &args.kind)?, args.input.trim())
        .with_complexity(parse_value("complexity", &args.complexity)?)
        .with_risk_level(parse_value("risk", &args.risk)?)
        .with_multi_step(args.multi_step)
        .with_files(args.files.iter().cloned());
    Ok(intent)
}

fn read_intent_file(path: &Path) -> Result<Intent> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read intent file {}", path.display()))?;
    let intent = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON intent in {}", path.display()))?,
        Some("yaml" | "yml") => serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid YAML intent in {}", path.display()))?,
        other => bail!(
            "Unsupported intent file extension {:?}; use .json, .yaml or .yml",
            other.unwrap_or("")
        ),
    };
    Ok(intent)
}

/// Parse a snake_case enum value the way it appears in intent files.
fn parse_value<T: DeserializeOwned>(field: &str, value: &str) -> Result<T> {
    serde_yaml::from_str(value.trim()).with_context(|| format!("Invalid {field}: '{value}'"))
}
