//! LLM integration crate for Prompt Vault.
//!
//! This crate provides a provider-agnostic abstraction for executing a
//! rendered prompt against a Large Language Model. Providers implement the
//! [`LlmClient`] capability and are looked up by name through a
//! [`ProviderRouter`].
//!
//! # Providers
//! - **OpenAI**: chat completions
//! - **Anthropic**: messages API
//! - **Google**: Gemini `generateContent`
//! - **Ollama**: local runtime, no key required
//!
//! # Example
//! ```no_run
//! use promptvault_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod router;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{build_router, create_client};
pub use router::ProviderRouter;
pub use types::ProviderType;
