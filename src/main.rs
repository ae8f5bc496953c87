//! Tactician CLI entry point.

use clap::Parser;

use tactician::cli::commands::{self, load_config};
use tactician::cli::{handle_error, Cli, Commands};
use tactician::infrastructure::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };
    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Plan(args) => commands::plan::execute(args, &config, cli.json).await,
        Commands::Run(args) => commands::run::execute(args, &config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
