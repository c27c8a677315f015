//! LLM provider factory.
//!
//! This module turns configured credentials into concrete clients and
//! assembles the per-command provider router.

use crate::client::LlmClient;
use crate::providers::{AnthropicClient, GoogleClient, OllamaClient, OpenAiClient};
use crate::router::ProviderRouter;
use crate::types::ProviderType;
use promptvault_core::config::SUPPORTED_PROVIDERS;
use promptvault_core::{AppConfig, AppError, AppResult};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "anthropic", "google", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (for providers that require it)
///
/// # Errors
/// Returns `ProviderNotConfigured` if the provider is unknown or a required
/// key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::ProviderNotConfigured(format!("Unknown provider: {}", provider)))?;

    let api_key = api_key.filter(|k| !k.is_empty());
    if provider_type.requires_api_key() && api_key.is_none() {
        return Err(AppError::ProviderNotConfigured(format!(
            "{} provider requires an API key",
            provider_type
        )));
    }
    let key = api_key.unwrap_or_default();

    let client: Arc<dyn LlmClient> = match (provider_type, endpoint) {
        (ProviderType::Ollama, Some(url)) => Arc::new(OllamaClient::with_base_url(url)),
        (ProviderType::Ollama, None) => Arc::new(OllamaClient::new()),
        (ProviderType::OpenAI, Some(url)) => Arc::new(OpenAiClient::with_base_url(url, key)),
        (ProviderType::OpenAI, None) => Arc::new(OpenAiClient::new(key)),
        (ProviderType::Anthropic, Some(url)) => Arc::new(AnthropicClient::with_base_url(url, key)),
        (ProviderType::Anthropic, None) => Arc::new(AnthropicClient::new(key)),
        (ProviderType::Google, Some(url)) => Arc::new(GoogleClient::with_base_url(url, key)),
        (ProviderType::Google, None) => Arc::new(GoogleClient::new(key)),
    };

    Ok(client)
}

/// Build a router from the providers configured for this workspace.
///
/// Every supported provider is considered, plus any extra entries in the
/// config file. A provider is registered when its credentials resolve, either
/// from the config file or from its conventional environment variable.
/// Providers whose credentials do not resolve are skipped; asking the router
/// for them later yields `ProviderNotConfigured`.
pub fn build_router(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new();

    for (name, source) in provider_sources(config) {
        let endpoint = config.provider(source).and_then(|c| c.endpoint.as_deref());
        let api_key = config.resolve_api_key(source).or_else(|| {
            if source == name {
                None
            } else {
                config.resolve_api_key(name)
            }
        });
        match create_client(name, endpoint, api_key.as_deref()) {
            Ok(client) => router.register(client),
            Err(e) => tracing::debug!("Skipping provider '{}': {}", source, e),
        }
    }

    tracing::debug!("Provider router ready: {:?}", router.names());
    router
}

/// Map each canonical provider name to the config entry it is built from.
///
/// An entry under the canonical name wins over one under an alias, so a
/// `claude:` section only applies when there is no `anthropic:` section.
fn provider_sources(config: &AppConfig) -> BTreeMap<&str, &str> {
    let mut sources: BTreeMap<&str, &str> = SUPPORTED_PROVIDERS.iter().map(|n| (*n, *n)).collect();

    for key in config.providers.keys() {
        let name = ProviderType::canonical_name(key);
        if name == key.as_str() || !config.providers.contains_key(name) {
            sources.insert(name, key.as_str());
        }
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptvault_core::ProviderCredentials;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None) {
            Err(AppError::ProviderNotConfigured(msg)) => assert!(msg.contains("requires an API key")),
            _ => panic!("Expected error for OpenAI without API key"),
        }
        assert!(create_client("openai", None, Some("")).is_err());
    }

    #[test]
    fn test_alias_maps_to_canonical_name() {
        let client = create_client("claude", None, Some("key")).unwrap();
        assert_eq!(client.provider_name(), "anthropic");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }

    #[test]
    fn test_build_router_skips_unusable_providers() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "ollama".to_string(),
            ProviderCredentials {
                endpoint: Some("http://localhost:11434".to_string()),
                ..Default::default()
            },
        );
        config.providers.insert(
            "openai".to_string(),
            ProviderCredentials {
                api_key: Some("sk-test".to_string()),
                ..Default::default()
            },
        );
        config.providers.insert(
            "mystery".to_string(),
            ProviderCredentials::default(),
        );

        let router = build_router(&config);
        let names = router.names();
        assert!(names.contains(&"ollama".to_string()));
        assert!(names.contains(&"openai".to_string()));
        assert!(!names.contains(&"mystery".to_string()));
        assert!(router.get("mystery").is_err());
    }

    #[test]
    fn test_alias_entries_do_not_override_canonical() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "anthropic".to_string(),
            ProviderCredentials {
                api_key: Some("canonical-key".to_string()),
                ..Default::default()
            },
        );
        config.providers.insert(
            "claude".to_string(),
            ProviderCredentials {
                api_key: Some("alias-key".to_string()),
                endpoint: Some("http://alias.invalid".to_string()),
                ..Default::default()
            },
        );
        config.providers.insert(
            "gemini".to_string(),
            ProviderCredentials {
                api_key: Some("gemini-key".to_string()),
                ..Default::default()
            },
        );

        let sources = provider_sources(&config);
        assert_eq!(sources.get("anthropic"), Some(&"anthropic"));
        assert_eq!(sources.get("google"), Some(&"gemini"));
        assert!(!sources.contains_key("claude"));
        assert!(!sources.contains_key("gemini"));

        let router = build_router(&config);
        let names = router.names();
        assert_eq!(names.iter().filter(|n| n.as_str() == "anthropic").count(), 1);
        assert!(names.contains(&"google".to_string()));
        assert!(!names.contains(&"claude".to_string()));
        assert_eq!(router.get("claude").unwrap().provider_name(), "anthropic");
        assert_eq!(router.get("Gemini").unwrap().provider_name(), "google");
    }

    #[test]
    fn test_build_router_registers_ollama_without_config() {
        let router = build_router(&AppConfig::default());
        assert!(router.get("ollama").is_ok());
    }
}
