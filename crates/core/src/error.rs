//! Error types for Prompt Vault.
//!
//! This module defines a unified error enum covering every failure a
//! command can hit: missing entities, name collisions, variable and template
//! problems, provider failures, and persistence errors.

use thiserror::Error;

/// Unified error type for Prompt Vault.
///
/// All library functions return `Result<T, AppError>`. Everything up to and
/// including provider dispatch is fatal to a command; the run pipeline is the
/// only place that downgrades an error (ledger persistence) to a warning.
#[derive(Error, Debug)]
pub enum AppError {
    /// A vault, prompt, version or run does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A vault or prompt name is already taken
    #[error("Already exists: {0}")]
    DuplicateName(String),

    /// A vault or prompt name is empty or otherwise unusable
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// A vault still owns prompts and cannot be deleted without cascading
    #[error("Vault not empty: {0}")]
    VaultNotEmpty(String),

    /// The `--vars` string could not be parsed
    #[error("Malformed variables: {0}")]
    MalformedVariables(String),

    /// Template syntax or evaluation failure
    #[error("Render error: {0}")]
    Render(String),

    /// The requested provider has no client registered
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// The provider call itself failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// Store I/O failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Concurrent version appends kept colliding
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Shorthand for a `NotFound` error naming the kind and key of the entity.
    pub fn not_found(kind: &str, key: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} '{}'", kind, key))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = AppError::not_found("vault", "demo");
        assert_eq!(err.to_string(), "Not found: vault 'demo'");
    }

    #[test]
    fn test_json_error_conversion() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
