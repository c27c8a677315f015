//! Name-keyed registry of provider clients.

use crate::client::LlmClient;
use crate::types::ProviderType;
use promptvault_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Routes completion requests to a provider by name.
///
/// The router is built fresh for each command from the credentials that are
/// currently configured. It holds no connections of its own and never retries.
#[derive(Default, Clone)]
pub struct ProviderRouter {
    clients: HashMap<String, Arc<dyn LlmClient>>,
}

impl ProviderRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under its own provider name.
    ///
    /// A client registered under a name that is already taken replaces the
    /// previous one.
    pub fn register(&mut self, client: Arc<dyn LlmClient>) {
        let name = client.provider_name().to_string();
        if self.clients.insert(name.clone(), client).is_some() {
            tracing::debug!("Replaced provider client: {}", name);
        } else {
            tracing::debug!("Registered provider client: {}", name);
        }
    }

    /// Look up a client by provider name.
    ///
    /// Aliases and case variants resolve to the canonical provider, so
    /// `claude` finds the client registered as `anthropic`.
    pub fn get(&self, name: &str) -> AppResult<Arc<dyn LlmClient>> {
        let key = ProviderType::canonical_name(name);
        self.clients.get(key).cloned().ok_or_else(|| {
            let available = self.names();
            if available.is_empty() {
                AppError::ProviderNotConfigured(format!(
                    "{} (no providers configured; use 'provider add')",
                    name
                ))
            } else {
                AppError::ProviderNotConfigured(format!(
                    "{} (available: {})",
                    name,
                    available.join(", ")
                ))
            }
        })
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl std::fmt::Debug for ProviderRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRouter")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{LlmRequest, LlmResponse};

    struct FixedClient {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait::async_trait]
    impl LlmClient for FixedClient {
        fn provider_name(&self) -> &str {
            self.name
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            Ok(LlmResponse::text(self.reply, &request.model))
        }
    }

    #[tokio::test]
    async fn test_register_and_dispatch() {
        let mut router = ProviderRouter::new();
        router.register(Arc::new(FixedClient {
            name: "openai",
            reply: "from openai",
        }));
        router.register(Arc::new(FixedClient {
            name: "anthropic",
            reply: "from anthropic",
        }));

        assert_eq!(router.names(), vec!["anthropic", "openai"]);

        let client = router.get("anthropic").unwrap();
        let response = client
            .complete(&LlmRequest::new("hi", "claude"))
            .await
            .unwrap();
        assert_eq!(response.content, "from anthropic");
    }

    #[test]
    fn test_get_resolves_aliases() {
        let mut router = ProviderRouter::new();
        router.register(Arc::new(FixedClient {
            name: "anthropic",
            reply: "",
        }));
        router.register(Arc::new(FixedClient {
            name: "google",
            reply: "",
        }));

        for name in ["anthropic", "Anthropic", "claude", "CLAUDE"] {
            assert_eq!(router.get(name).unwrap().provider_name(), "anthropic");
        }
        assert_eq!(router.get("gemini").unwrap().provider_name(), "google");
        assert_eq!(router.names(), vec!["anthropic", "google"]);
    }

    #[test]
    fn test_get_unknown_provider() {
        let mut router = ProviderRouter::new();
        router.register(Arc::new(FixedClient {
            name: "openai",
            reply: "",
        }));

        match router.get("google") {
            Err(AppError::ProviderNotConfigured(msg)) => {
                assert!(msg.contains("google"));
                assert!(msg.contains("openai"));
            }
            other => panic!("expected ProviderNotConfigured, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_register_replaces_same_name() {
        let mut router = ProviderRouter::new();
        router.register(Arc::new(FixedClient {
            name: "ollama",
            reply: "first",
        }));
        router.register(Arc::new(FixedClient {
            name: "ollama",
            reply: "second",
        }));

        assert_eq!(router.names().len(), 1);
        let response = router
            .get("ollama")
            .unwrap()
            .complete(&LlmRequest::new("x", "m"))
            .await
            .unwrap();
        assert_eq!(response.content, "second");
    }

    #[test]
    fn test_empty_router() {
        let router = ProviderRouter::new();
        assert!(router.is_empty());
        assert!(matches!(
            router.get("openai"),
            Err(AppError::ProviderNotConfigured(_))
        ));
    }
}
