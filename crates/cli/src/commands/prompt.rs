//! Prompt command handlers.

use clap::{Args, Subcommand};
use promptvault_core::{config::AppConfig, AppResult};
use serde_json::json;

use super::{display_time, open_store, print_json, read_content};

/// Manage prompts and their versions
#[derive(Args, Debug)]
pub struct PromptCommand {
    #[command(subcommand)]
    pub action: PromptAction,
}

#[derive(Subcommand, Debug)]
pub enum PromptAction {
    /// Add a new prompt to a vault
    Add(PromptAddCommand),
    /// Store a new version of a prompt
    Update(PromptUpdateCommand),
    /// List prompts in a vault
    List(PromptListCommand),
    /// Show prompt content
    Show(PromptShowCommand),
    /// Show the version history of a prompt
    History(PromptHistoryCommand),
}

impl PromptCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            PromptAction::Add(cmd) => cmd.execute(config),
            PromptAction::Update(cmd) => cmd.execute(config),
            PromptAction::List(cmd) => cmd.execute(config),
            PromptAction::Show(cmd) => cmd.execute(config),
            PromptAction::History(cmd) => cmd.execute(config),
        }
    }
}

#[derive(Args, Debug)]
pub struct PromptAddCommand {
    /// Vault to add the prompt to
    #[arg(long)]
    pub vault: String,

    /// Prompt name, unique within the vault
    #[arg(short, long)]
    pub name: String,

    /// Prompt template ("-" reads stdin)
    #[arg(short, long)]
    pub prompt: String,
}

impl PromptAddCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let content = read_content(&self.prompt)?;
        let store = open_store(config)?;
        store.prompts().add(&self.vault, &self.name, &content)?;
        println!("Added prompt '{}' to vault '{}'", self.name, self.vault);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct PromptUpdateCommand {
    /// Vault holding the prompt
    #[arg(long)]
    pub vault: String,

    /// Prompt name
    #[arg(short, long)]
    pub name: String,

    /// New prompt template ("-" reads stdin)
    #[arg(short, long)]
    pub prompt: String,
}

impl PromptUpdateCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let content = read_content(&self.prompt)?;
        let store = open_store(config)?;
        let version = store
            .prompts()
            .append_version(&self.vault, &self.name, &content)?;
        println!(
            "Updated prompt '{}' in vault '{}' (v{})",
            self.name, self.vault, version.version
        );
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct PromptListCommand {
    /// Vault to list
    #[arg(long)]
    pub vault: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptListCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;
        let prompts = store.prompts().list(&self.vault)?;

        if self.json {
            return print_json(&prompts);
        }

        if prompts.is_empty() {
            println!("No prompts found in vault '{}'", self.vault);
            return Ok(());
        }

        println!("Prompts in vault '{}':", self.vault);
        for prompt in &prompts {
            println!(
                "  {} (v{}, created: {})",
                prompt.name,
                prompt.latest_version,
                display_time(&prompt.created_at)
            );
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct PromptShowCommand {
    /// Vault holding the prompt
    #[arg(long)]
    pub vault: String,

    /// Prompt name
    #[arg(short, long, visible_alias = "name")]
    pub prompt: String,

    /// Version to show (latest when omitted)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub revision: Option<u32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptShowCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;
        let prompts = store.prompts();

        let content = match self.revision {
            Some(revision) => prompts.content_at(&self.vault, &self.prompt, revision)?,
            None => {
                let prompt = prompts.latest(&self.vault, &self.prompt)?;
                prompts.content_latest(prompt.id)?
            }
        };

        if self.json {
            return print_json(&json!({
                "vault": self.vault,
                "prompt": self.prompt,
                "version": content.version,
                "content": content.content,
            }));
        }

        let label = match self.revision {
            Some(revision) => format!("v{}", revision),
            None => format!("latest, v{}", content.version),
        };
        println!(
            "Prompt '{}' in vault '{}' ({}):",
            self.prompt, self.vault, label
        );
        println!("---\n{}\n---", content.content);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct PromptHistoryCommand {
    /// Vault holding the prompt
    #[arg(long)]
    pub vault: String,

    /// Prompt name
    #[arg(short, long)]
    pub name: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptHistoryCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;
        let prompt = store.prompts().latest(&self.vault, &self.name)?;
        let history = store.prompts().history(prompt.id)?;

        if self.json {
            return print_json(&history);
        }

        println!(
            "History for prompt '{}' in vault '{}':",
            self.name, self.vault
        );
        for entry in &history {
            println!(
                "  v{} (created: {})",
                entry.version,
                display_time(&entry.created_at)
            );
        }
        Ok(())
    }
}
