//! Provider credential command handlers.

use clap::{Args, Subcommand};
use promptvault_core::{config::AppConfig, AppError, AppResult};

/// Manage provider credentials
#[derive(Args, Debug)]
pub struct ProviderCommand {
    #[command(subcommand)]
    pub action: ProviderAction,
}

#[derive(Subcommand, Debug)]
pub enum ProviderAction {
    /// Add or replace a provider's API key
    Add(ProviderAddCommand),
    /// List configured providers
    List,
    /// Remove a provider
    Delete(ProviderDeleteCommand),
}

impl ProviderCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            ProviderAction::Add(cmd) => cmd.execute(config),
            ProviderAction::List => list(config),
            ProviderAction::Delete(cmd) => cmd.execute(config),
        }
    }
}

#[derive(Args, Debug)]
pub struct ProviderAddCommand {
    /// Provider name (openai, anthropic, google, ollama)
    pub name: String,

    /// API key
    pub api_key: String,
}

impl ProviderAddCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let mut config = config.clone();
        config.set_provider_key(&self.name, &self.api_key)?;
        config.save()?;
        println!("Added/updated provider: {}", self.name);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ProviderDeleteCommand {
    /// Provider name
    pub name: String,
}

impl ProviderDeleteCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let mut config = config.clone();
        if !config.remove_provider(&self.name)? {
            return Err(AppError::not_found("provider", &self.name));
        }
        config.save()?;
        println!("Deleted provider: {}", self.name);
        Ok(())
    }
}

fn list(config: &AppConfig) -> AppResult<()> {
    if config.providers.is_empty() {
        println!("No providers configured");
        return Ok(());
    }

    println!("Configured providers:");
    for (name, creds) in &config.providers {
        let key = match (&creds.api_key, &creds.api_key_env) {
            (Some(key), _) => mask_key(key),
            (None, Some(var)) => format!("${}", var),
            (None, None) => "(no key)".to_string(),
        };
        match &creds.endpoint {
            Some(endpoint) => println!("  {}: {} [{}]", name, key, endpoint),
            None => println!("  {}: {}", name, key),
        }
    }
    Ok(())
}

/// Hide all but the edges of a key.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("short"), "***");
        assert_eq!(mask_key("12345678"), "***");
        assert_eq!(mask_key("sk-abcdefghijkl"), "sk-a...ijkl");
    }

    #[test]
    fn test_add_and_delete_round_trip_through_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load(Some(temp.path().to_path_buf()), None).unwrap();

        ProviderAddCommand {
            name: "openai".to_string(),
            api_key: "sk-test-key-123".to_string(),
        }
        .execute(&config)
        .unwrap();

        let reloaded = AppConfig::load(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(
            reloaded.provider("openai").and_then(|c| c.api_key.clone()),
            Some("sk-test-key-123".to_string())
        );

        ProviderDeleteCommand {
            name: "openai".to_string(),
        }
        .execute(&reloaded)
        .unwrap();

        let reloaded = AppConfig::load(Some(temp.path().to_path_buf()), None).unwrap();
        assert!(reloaded.provider("openai").is_none());

        let err = ProviderDeleteCommand {
            name: "openai".to_string(),
        }
        .execute(&reloaded)
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
