//! Command handlers for the Prompt Vault CLI.
//!
//! Each command group lives in its own submodule.

pub mod prompt;
pub mod provider;
pub mod run;
pub mod vault;

pub use prompt::PromptCommand;
pub use provider::ProviderCommand;
pub use run::RunCommand;
pub use vault::VaultCommand;

use promptvault_core::{config::AppConfig, AppResult};
use promptvault_store::Store;
use std::io::Read;

/// Open the workspace database, creating it on first use.
pub(crate) fn open_store(config: &AppConfig) -> AppResult<Store> {
    Store::open(&config.database_path())
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Resolve prompt content given on the command line; `-` reads stdin.
pub(crate) fn read_content(arg: &str) -> AppResult<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }

    let mut content = String::new();
    std::io::stdin().read_to_string(&mut content)?;
    Ok(content.strip_suffix('\n').unwrap_or(&content).to_string())
}

/// Format a timestamp for listings.
pub(crate) fn display_time(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_content_literal() {
        assert_eq!(read_content("Hello {{.name}}").unwrap(), "Hello {{.name}}");
    }

    #[test]
    fn test_display_time() {
        let ts = chrono::DateTime::parse_from_rfc3339("2024-03-05T07:08:09.123456Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        assert_eq!(display_time(&ts), "2024-03-05 07:08:09");
    }
}
