use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named namespace grouping prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vault {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A named prompt inside a vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: i64,
    pub vault_id: i64,
    pub vault_name: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Highest version number stored for this prompt.
    pub latest_version: u32,
}

/// One immutable snapshot of a prompt's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptVersion {
    pub id: i64,
    pub prompt_id: i64,
    pub version: u32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Version listing entry, without content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

/// Content resolved for a run, along with the row it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedContent {
    pub version_id: i64,
    pub version: u32,
    pub content: String,
}

/// A recorded execution of one prompt version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: i64,
    pub prompt_version_id: i64,
    pub vault_name: String,
    pub prompt_name: String,
    pub version: u32,
    pub provider: String,
    /// Serialized run parameters as stored.
    pub params: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl Run {
    /// Parse the stored parameter document.
    pub fn params_json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.params).ok()
    }
}
