//! OpenRouter-compatible HTTP client for content generation.
//!
//! Speaks the OpenAI `chat/completions` wire format, so any compatible
//! gateway works via a custom base URL.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::client::{GenerationClient, GenerationRequest, GenerationResponse, Usage};
use crate::error::LlmError;

/// Default OpenRouter API endpoint.
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// OpenRouter client for generation requests.
pub struct OpenRouterClient {
    /// HTTP client for making API requests.
    client: Client,
    /// API key for authentication.
    api_key: String,
    /// Base URL for the API.
    base_url: String,
    /// Default model to use when a request leaves the model empty.
    default_model: String,
}

impl OpenRouterClient {
    /// Create a new client with the given API key and default model.
    pub fn new(api_key: String, default_model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client - system TLS configuration error"),
            api_key,
            base_url: OPENROUTER_BASE_URL.to_string(),
            default_model,
        }
    }

    /// Override the base URL. Useful for OpenRouter-compatible proxies
    /// and for tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create a client from environment variables.
    ///
    /// Reads `OPENROUTER_API_KEY` (required) and `DOCFORGE_API_BASE`
    /// (optional, defaults to the public OpenRouter endpoint).
    ///
    /// # Errors
    ///
    /// Returns `LlmError::MissingApiKey` if `OPENROUTER_API_KEY` is not set.
    pub fn from_env(default_model: String) -> Result<Self, LlmError> {
        let api_key = env::var("OPENROUTER_API_KEY").map_err(|_| LlmError::MissingApiKey)?;
        let mut client = Self::new(api_key, default_model);
        if let Ok(base) = env::var("DOCFORGE_API_BASE") {
            client.base_url = base;
        }
        Ok(client)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the default model.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }
}

/// Internal request structure for the OpenAI-compatible API.
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<super::client::Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Internal response structure from the OpenAI-compatible API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl GenerationClient for OpenRouterClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let api_request = ApiRequest {
            model,
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);

        let http_response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                if status_code == 429 {
                    return Err(LlmError::RateLimited(error_response.error.message));
                }
                return Err(LlmError::ApiError {
                    code: status_code,
                    message: error_response.error.message,
                });
            }

            return Err(LlmError::ApiError {
                code: status_code,
                message: error_text,
            });
        }

        let api_response: ApiResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {}", e)))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        Ok(GenerationResponse {
            model: api_response.model,
            content,
            usage: Usage::new(
                api_response.usage.prompt_tokens,
                api_response.usage.completion_tokens,
            ),
        })
    }
}
