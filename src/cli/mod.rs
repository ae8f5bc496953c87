//! Command-line interface.

pub mod commands;
pub mod output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tactician")]
#[command(about = "Tactician - plan and execute tasks from a classified intent", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .tactician/
    #[arg(short, long, global = true, env = "TACTICIAN_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build an execution plan and print it
    Plan(IntentArgs),
    /// Build an execution plan and execute it with the built-in strategies
    Run(IntentArgs),
}

/// Where the intent comes from.
///
/// `INPUT` is a path to a JSON or YAML intent file, or else the action
/// text of an intent described by the flags below.
#[derive(Args, Debug, Clone)]
pub struct IntentArgs {
    /// Intent file (.json, .yaml, .yml) or action text
    pub input: String,

    /// Intent type: task_request, question, command
    #[arg(short, long, default_value = "task_request")]
    pub kind: String,

    /// Complexity: simple, moderate, complex, expert
    #[arg(long, default_value = "moderate")]
    pub complexity: String,

    /// Risk level: low, medium, high
    #[arg(short, long, default_value = "low")]
    pub risk: String,

    /// The request spans several steps
    #[arg(short, long)]
    pub multi_step: bool,

    /// Files the request touches (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub files: Vec<String>,
}

/// Report a command error and exit with a failure status.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_flags() {
        let cli = Cli::try_parse_from([
            "tactician",
            "run",
            "implement rate limiter",
            "--complexity",
            "complex",
            "--multi-step",
            "--files",
            "a.rs,b.rs",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.input, "implement rate limiter");
        assert_eq!(args.complexity, "complex");
        assert!(args.multi_step);
        assert_eq!(args.files, vec!["a.rs", "b.rs"]);
    }
}
