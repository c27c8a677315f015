//! Anthropic messages API provider.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use promptvault_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Default API base URL.
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";

const API_VERSION: &str = "2023-06-01";

/// The messages API requires `max_tokens`; used when the request leaves it unset.
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Anthropic LLM client.
pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a client against the public API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_ANTHROPIC_URL, api_key)
    }

    /// Create a client against a custom endpoint.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_messages_request(&self, request: &LlmRequest) -> MessagesRequest {
        MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
        }
    }

    fn convert_response(&self, response: MessagesResponse) -> LlmResponse {
        // Text blocks are concatenated; other block kinds carry no prose.
        let content = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        LlmResponse {
            content,
            model: response.model,
            usage,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Anthropic");
        tracing::debug!("Request: {:?}", request);

        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.to_messages_request(request))
            .send()
            .await
            .map_err(|e| {
                AppError::Provider(format!("Failed to send request to Anthropic: {}", e))
            })?;

        let response = super::ensure_success("Anthropic", response).await?;

        let messages_response: MessagesResponse = response.json().await.map_err(|e| {
            AppError::Provider(format!("Failed to parse Anthropic response: {}", e))
        })?;

        tracing::info!("Received completion from Anthropic");
        Ok(self.convert_response(messages_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_tokens_defaulted() {
        let client = AnthropicClient::new("key");
        let converted = client.to_messages_request(&LlmRequest::new("Hi", "claude-3-5-haiku"));
        assert_eq!(converted.max_tokens, DEFAULT_MAX_TOKENS);

        let converted = client
            .to_messages_request(&LlmRequest::new("Hi", "claude-3-5-haiku").with_max_tokens(50));
        assert_eq!(converted.max_tokens, 50);
    }

    #[test]
    fn test_text_blocks_joined() {
        let client = AnthropicClient::new("key");
        let raw = r#"{
            "id": "msg_1",
            "model": "claude-3-5-haiku",
            "content": [
                {"type": "text", "text": "Hello, "},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": "world"}
            ],
            "usage": {"input_tokens": 5, "output_tokens": 2}
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();

        let response = client.convert_response(parsed);
        assert_eq!(response.content, "Hello, world");
        assert_eq!(response.usage, LlmUsage::new(5, 2));
    }
}
