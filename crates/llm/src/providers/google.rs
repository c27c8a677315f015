//! Google Gemini `generateContent` provider.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use promptvault_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Default API base URL.
pub const DEFAULT_GOOGLE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Google Gemini LLM client.
pub struct GoogleClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GoogleClient {
    /// Create a client against the public API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_GOOGLE_URL, api_key)
    }

    /// Create a client against a custom endpoint.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_generate_request(&self, request: &LlmRequest) -> GenerateRequest {
        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(request.prompt.clone()),
                }],
            }],
            generation_config,
        }
    }

    fn convert_response(&self, model: &str, response: GenerateResponse) -> AppResult<LlmResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Provider("Gemini returned no candidates".to_string()))?;

        let content = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        let usage = response
            .usage_metadata
            .map(|u| LlmUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: model.to_string(),
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for GoogleClient {
    fn provider_name(&self) -> &str {
        "google"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Gemini");
        tracing::debug!("Request: {:?}", request);

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.to_generate_request(request))
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to send request to Gemini: {}", e)))?;

        let response = super::ensure_success("Gemini", response).await?;

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse Gemini response: {}", e)))?;

        tracing::info!("Received completion from Gemini");
        self.convert_response(&request.model, generate_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_config_only_when_set() {
        let client = GoogleClient::new("key");

        let plain = client.to_generate_request(&LlmRequest::new("Hi", "gemini-1.5-flash"));
        assert!(plain.generation_config.is_none());

        let tuned = client.to_generate_request(
            &LlmRequest::new("Hi", "gemini-1.5-flash").with_temperature(1.0),
        );
        assert_eq!(
            tuned.generation_config,
            Some(GenerationConfig {
                temperature: Some(1.0),
                max_output_tokens: None,
            })
        );
    }

    #[test]
    fn test_response_conversion() {
        let client = GoogleClient::new("key");
        let raw = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Bonjour"}]}}],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 1}
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();

        let response = client.convert_response("gemini-1.5-flash", parsed).unwrap();
        assert_eq!(response.content, "Bonjour");
        assert_eq!(response.model, "gemini-1.5-flash");
        assert_eq!(response.usage.total_tokens, 4);
    }

    #[test]
    fn test_no_candidates_is_provider_error() {
        let client = GoogleClient::new("key");
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(client.convert_response("m", parsed).is_err());
    }
}
