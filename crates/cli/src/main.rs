//! Prompt Vault CLI
//!
//! Main entry point for the promptvault command-line tool.
//! Stores versioned prompt templates in vaults, runs them against LLM
//! providers, and keeps a ledger of every run.

mod commands;
mod runner;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{PromptCommand, ProviderCommand, RunCommand, VaultCommand};
use promptvault_core::{config::AppConfig, logging};
use std::path::PathBuf;
use std::process::ExitCode;

/// Prompt Vault - versioned prompts and run history
#[derive(Parser, Debug)]
#[command(name = "promptvault")]
#[command(about = "Versioned prompt vault with run history", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the SQLite database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage vaults
    Vault(VaultCommand),

    /// Manage prompts and their versions
    Prompt(PromptCommand),

    /// Manage provider credentials
    Provider(ProviderCommand),

    /// Execute prompts and inspect past runs
    Run(RunCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Vault(_) => "vault",
            Commands::Prompt(_) => "prompt",
            Commands::Provider(_) => "provider",
            Commands::Run(_) => "run",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Flag and RUST_LOG arrive through `log_level`, so they beat the file
    let config = AppConfig::load(cli.workspace, cli.config)
        .context("Failed to load configuration")?
        .with_overrides(cli.db, cli.log_level, cli.verbose, cli.no_color);

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Database: {:?}", config.database_path());

    config.ensure_state_dir()?;

    let command_name = cli.command.name();
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Vault(cmd) => cmd.execute(&config),
        Commands::Prompt(cmd) => cmd.execute(&config),
        Commands::Provider(cmd) => cmd.execute(&config),
        Commands::Run(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    Ok(result?)
}
