//! Vault command handlers.

use clap::{Args, Subcommand};
use promptvault_core::{config::AppConfig, AppError, AppResult};

use super::{display_time, open_store, print_json};

/// Manage vaults
#[derive(Args, Debug)]
pub struct VaultCommand {
    #[command(subcommand)]
    pub action: VaultAction,
}

#[derive(Subcommand, Debug)]
pub enum VaultAction {
    /// Create a new vault
    Create(VaultCreateCommand),
    /// List vaults
    List(VaultListCommand),
    /// Delete a vault
    Delete(VaultDeleteCommand),
}

impl VaultCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            VaultAction::Create(cmd) => cmd.execute(config),
            VaultAction::List(cmd) => cmd.execute(config),
            VaultAction::Delete(cmd) => cmd.execute(config),
        }
    }
}

#[derive(Args, Debug)]
pub struct VaultCreateCommand {
    /// Vault name
    pub name: String,
}

impl VaultCreateCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;
        let vault = store.vaults().create(&self.name)?;
        println!("Created vault: {}", vault.name);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct VaultListCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl VaultListCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;
        let vaults = store.vaults().list()?;

        if self.json {
            return print_json(&vaults);
        }

        if vaults.is_empty() {
            println!("No vaults found");
            return Ok(());
        }

        println!("Vaults:");
        for vault in &vaults {
            println!("  {} (created: {})", vault.name, display_time(&vault.created_at));
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct VaultDeleteCommand {
    /// Vault name
    pub name: String,

    /// Also delete the vault's prompts, versions and runs
    #[arg(long)]
    pub force: bool,
}

impl VaultDeleteCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;

        let removed = if self.force {
            store.vaults().delete_cascade(&self.name)?
        } else {
            store.vaults().delete(&self.name)?
        };

        if removed == 0 {
            return Err(AppError::not_found("vault", &self.name));
        }

        println!("Deleted vault: {}", self.name);
        Ok(())
    }
}
