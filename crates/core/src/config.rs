//! Configuration management for Prompt Vault.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Config file (`.promptvault/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: the database and the config file
//! both live in `<workspace>/.promptvault/` unless overridden. The config file
//! is also the credential source for LLM providers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".promptvault";

/// Default config file name inside the state directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default database file name inside the state directory.
pub const DATABASE_FILE_NAME: &str = "promptvault.db";

/// Providers the factory knows how to build.
pub const SUPPORTED_PROVIDERS: [&str; 4] = ["openai", "anthropic", "google", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .promptvault/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Optional database path
    pub database: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider credentials keyed by provider name
    pub providers: BTreeMap<String, ProviderCredentials>,
}

/// Credentials and endpoint for a single provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    /// Literal API key
    #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv", default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Custom endpoint (base URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    logging: Option<LoggingConfig>,

    #[serde(default)]
    providers: BTreeMap<String, ProviderCredentials>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            database: None,
            log_level: None,
            verbose: false,
            no_color: false,
            providers: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration for a workspace.
    ///
    /// `workspace` and `config_file` take precedence over the
    /// `PROMPTVAULT_WORKSPACE` and `PROMPTVAULT_CONFIG` environment variables.
    /// `PROMPTVAULT_DB` sets the database path and `NO_COLOR` disables colors.
    ///
    /// # Example
    /// ```no_run
    /// use promptvault_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None, None).expect("Failed to load config");
    /// println!("Database: {:?}", config.database_path());
    /// ```
    pub fn load(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("PROMPTVAULT_WORKSPACE")) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env_path("PROMPTVAULT_CONFIG"));
        config.database = env_path("PROMPTVAULT_DB");

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config.config_path();
        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let file = read_config_file(path)?;
        let mut result = self.clone();

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        result.providers = file.providers;

        tracing::debug!(
            "Loaded config from {:?} ({} providers)",
            path,
            result.providers.len()
        );
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags win over the config file.
    pub fn with_overrides(
        mut self,
        database: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(database) = database {
            self.database = Some(database);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            self.log_level = Some("debug".to_string());
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .promptvault directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Path of the config file in effect.
    pub fn config_path(&self) -> PathBuf {
        self.config_file
            .clone()
            .unwrap_or_else(|| self.state_dir().join(CONFIG_FILE_NAME))
    }

    /// Path of the SQLite database in effect.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.state_dir().join(DATABASE_FILE_NAME))
    }

    /// Ensure the .promptvault directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Get a provider's credentials, if configured.
    pub fn provider(&self, name: &str) -> Option<&ProviderCredentials> {
        self.providers.get(name)
    }

    /// Resolve the API key for a provider.
    ///
    /// Order: literal `apiKey`, the variable named by `apiKeyEnv`, then the
    /// provider's conventional variable (e.g. `OPENAI_API_KEY`).
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(creds) = self.providers.get(provider) {
            if let Some(ref key) = creds.api_key {
                if !key.is_empty() {
                    return Some(key.clone());
                }
            }

            if let Some(ref env_var) = creds.api_key_env {
                if let Ok(key) = std::env::var(env_var) {
                    return Some(key);
                }
            }
        }

        default_key_env(provider).and_then(|var| std::env::var(var).ok())
    }

    /// Add or replace the API key of a supported provider.
    pub fn set_provider_key(&mut self, provider: &str, api_key: &str) -> AppResult<()> {
        ensure_supported(provider)?;

        let entry = self.providers.entry(provider.to_string()).or_default();
        entry.api_key = Some(api_key.to_string());
        Ok(())
    }

    /// Remove a provider entry. Returns whether anything was removed.
    pub fn remove_provider(&mut self, provider: &str) -> AppResult<bool> {
        ensure_supported(provider)?;
        Ok(self.providers.remove(provider).is_some())
    }

    /// Persist the provider table to the config file.
    ///
    /// The logging section of an existing file is preserved.
    pub fn save(&self) -> AppResult<()> {
        let path = self.config_path();

        let mut file = if path.exists() {
            read_config_file(&path)?
        } else {
            ConfigFile::default()
        };
        file.providers = self.providers.clone();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let yaml = serde_yaml::to_string(&file)?;
        std::fs::write(&path, yaml)
            .map_err(|e| AppError::Config(format!("Failed to write config {:?}: {}", path, e)))?;
        restrict_permissions(&path)?;

        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }
}

/// Conventional environment variable holding a provider's key.
pub fn default_key_env(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "google" => Some("GOOGLE_API_KEY"),
        _ => None,
    }
}

fn ensure_supported(provider: &str) -> AppResult<()> {
    if SUPPORTED_PROVIDERS.contains(&provider) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Unsupported provider: {} (supported: {})",
            provider,
            SUPPORTED_PROVIDERS.join(", ")
        )))
    }
}

fn read_config_file(path: &Path) -> AppResult<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("Failed to read config file {:?}: {}", path, e)))?;

    if contents.trim().is_empty() {
        return Ok(ConfigFile::default());
    }

    serde_yaml::from_str(&contents)
        .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> AppResult<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> AppResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> AppConfig {
        AppConfig {
            workspace: dir.to_path_buf(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_default_paths() {
        let config = AppConfig::default();
        assert!(config.state_dir().ends_with(STATE_DIR));
        assert!(config.config_path().ends_with("config.yaml"));
        assert!(config.database_path().ends_with("promptvault.db"));
    }

    #[test]
    fn test_ensure_state_dir() {
        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());
        assert!(!config.state_dir().exists());

        config.ensure_state_dir().unwrap();
        assert!(config.state_dir().is_dir());

        config.ensure_state_dir().unwrap();
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some(PathBuf::from("/tmp/other.db")),
            Some("info".to_string()),
            true,
            true,
        );

        assert_eq!(config.database_path(), PathBuf::from("/tmp/other.db"));
        assert!(config.verbose);
        assert!(config.no_color);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
logging:
  level: info
  color: false
providers:
  openai:
    apiKey: sk-test
  ollama:
    endpoint: http://localhost:8080
"#,
        )
        .unwrap();

        let config = config_in(temp.path()).merge_yaml(&path).unwrap();
        assert_eq!(config.log_level, Some("info".to_string()));
        assert!(config.no_color);
        assert_eq!(config.resolve_api_key("openai"), Some("sk-test".to_string()));
        assert_eq!(
            config.provider("ollama").and_then(|p| p.endpoint.clone()),
            Some("http://localhost:8080".to_string())
        );
    }

    #[test]
    fn test_resolve_api_key_from_named_env() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "anthropic".to_string(),
            ProviderCredentials {
                api_key_env: Some("PROMPTVAULT_TEST_ANTHROPIC_KEY".to_string()),
                ..Default::default()
            },
        );

        std::env::set_var("PROMPTVAULT_TEST_ANTHROPIC_KEY", "from-env");
        assert_eq!(
            config.resolve_api_key("anthropic"),
            Some("from-env".to_string())
        );
        std::env::remove_var("PROMPTVAULT_TEST_ANTHROPIC_KEY");
    }

    #[test]
    fn test_set_provider_key_rejects_unknown() {
        let mut config = AppConfig::default();
        assert!(config.set_provider_key("openai", "sk-1").is_ok());
        assert!(matches!(
            config.set_provider_key("cohere", "x"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(temp.path());
        config.set_provider_key("google", "g-key").unwrap();
        config.save().unwrap();

        let loaded = AppConfig::load(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(loaded.resolve_api_key("google"), Some("g-key".to_string()));

        let mut loaded = loaded;
        assert!(loaded.remove_provider("google").unwrap());
        assert!(!loaded.remove_provider("google").unwrap());
        loaded.save().unwrap();

        let reloaded = AppConfig::load(Some(temp.path().to_path_buf()), None).unwrap();
        assert!(reloaded.provider("google").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_config_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let mut config = config_in(temp.path());
        config.set_provider_key("openai", "sk-secret").unwrap();
        config.save().unwrap();

        let mode = std::fs::metadata(config.config_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
