//! Run command handlers.

use clap::{Args, Subcommand};
use promptvault_core::{config::AppConfig, AppResult};
use promptvault_llm::build_router;
use serde_json::json;

use super::{display_time, open_store, print_json};
use crate::runner::{RunPipeline, RunRequest, DEFAULT_TEMPERATURE};

/// Execute prompts and inspect past runs
#[derive(Args, Debug)]
pub struct RunCommand {
    #[command(subcommand)]
    pub action: RunAction,
}

#[derive(Subcommand, Debug)]
pub enum RunAction {
    /// Render a prompt and send it to a provider
    Prompt(RunPromptCommand),
    /// List recent runs
    List(RunListCommand),
    /// Show a single run
    Show(RunShowCommand),
}

impl RunCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            RunAction::Prompt(cmd) => cmd.execute(config).await,
            RunAction::List(cmd) => cmd.execute(config),
            RunAction::Show(cmd) => cmd.execute(config),
        }
    }
}

#[derive(Args, Debug)]
pub struct RunPromptCommand {
    /// Vault holding the prompt
    pub vault: String,

    /// Prompt name
    pub name: String,

    /// Provider to send the prompt to
    #[arg(long)]
    pub provider: String,

    /// Model identifier
    #[arg(long)]
    pub model: String,

    /// Template variables: "k=v,k2=v2" or a JSON object
    #[arg(long)]
    pub vars: Option<String>,

    /// Prompt version to run (latest when omitted)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub version: Option<u32>,

    /// Sampling temperature
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Maximum tokens in the response
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Render only; do not contact the provider or record a run
    #[arg(long)]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunPromptCommand {
    fn request(&self) -> RunRequest {
        let mut request = RunRequest::new(&self.vault, &self.name, &self.provider, &self.model)
            .with_vars(self.vars.clone().unwrap_or_default())
            .with_version(self.version);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request
    }

    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(
            "Running prompt '{}/{}' with {} ({})",
            self.vault,
            self.name,
            self.provider,
            self.model
        );

        let store = open_store(config)?;
        let router = build_router(config);
        let pipeline = RunPipeline::new(&store, &router);
        let request = self.request();

        if self.dry_run {
            let prepared = pipeline.prepare(&request)?;
            if self.json {
                return print_json(&json!({
                    "rendered": prepared.rendered,
                    "version": prepared.version,
                }));
            }
            println!("Rendered prompt:\n---\n{}\n---", prepared.rendered);
            return Ok(());
        }

        let outcome = pipeline.execute(&request).await?;

        if let Some(ref warning) = outcome.warning {
            eprintln!("Warning: {}", warning);
        }

        if self.json {
            return print_json(&outcome);
        }

        println!("Rendered prompt:\n---\n{}\n---\n", outcome.rendered);
        println!("Response:\n{}", outcome.response);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct RunListCommand {
    /// Only runs of prompts in this vault
    #[arg(long)]
    pub vault: Option<String>,

    /// Only runs of prompts with this name
    #[arg(long)]
    pub prompt: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunListCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;
        let runs = store
            .runs()
            .list(self.vault.as_deref(), self.prompt.as_deref())?;

        if self.json {
            return print_json(&runs);
        }

        if runs.is_empty() {
            println!("No runs found");
            return Ok(());
        }

        println!("Recent runs:");
        for run in &runs {
            println!(
                "  Run {}: {}/{} v{} with {} (created: {})",
                run.id,
                run.vault_name,
                run.prompt_name,
                run.version,
                run.provider,
                display_time(&run.created_at)
            );
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct RunShowCommand {
    /// Run id
    pub id: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunShowCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;
        let run = store.runs().get(self.id)?;

        if self.json {
            return print_json(&run);
        }

        let params = run
            .params_json()
            .and_then(|p| serde_json::to_string_pretty(&p).ok())
            .unwrap_or_else(|| run.params.clone());

        println!("Run {}:", run.id);
        println!("  Prompt: {}/{} (v{})", run.vault_name, run.prompt_name, run.version);
        println!("  Provider: {}", run.provider);
        println!("  Created: {}", display_time(&run.created_at));
        println!("  Parameters:\n{}", params);
        println!("  Response:\n---\n{}\n---", run.response);
        Ok(())
    }
}
