// Refrain - validated LLM content generation
// Main entry point

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use refrain::cli::{run_check, run_news, run_songs, Cli, Commands};
use refrain::config::load_config;
use refrain::logging::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Startup failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let (config, sources) = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging)?;
    sources.log();

    let status = match &cli.command {
        Commands::Song { count } => run_songs(&config, *count).await?,
        Commands::News { topic } => run_news(&config, topic).await?,
        Commands::Check => run_check(&config),
    };
    Ok(status.is_success())
}
