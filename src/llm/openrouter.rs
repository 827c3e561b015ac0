//! OpenRouter API client

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::llm::types::*;
use crate::llm::LlmClient;

/// Configuration for the OpenRouter client
#[derive(Debug, Clone, Deserialize)]
pub struct OpenRouterConfig {
    /// API key (never logged)
    pub api_key: SecretString,
    /// Default model id (e.g. "anthropic/claude-3.5-sonnet")
    pub default_model: String,
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// OpenRouter API client
#[derive(Clone)]
pub struct OpenRouterClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: OpenRouterConfig,
    /// Rate limit state
    rate_limit: Arc<RwLock<RateLimitState>>,
}

/// Rate limit tracking
#[derive(Debug, Default)]
struct RateLimitState {
    /// Remaining requests
    remaining: Option<u32>,
    /// Reset timestamp
    reset_at: Option<u64>,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();

        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!(
                "Bearer {}",
                config.api_key.expose_secret()
            ))
            .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(OpenRouterClient {
            client,
            config,
            rate_limit: Arc::new(RwLock::new(RateLimitState::default())),
        })
    }

    /// Get the default model
    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Send a request to the OpenRouter API
    async fn send_request(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);

        debug!("Sending request to OpenRouter: model={}", request.model);

        let response = self.client.post(&url).json(&request).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("LLM round-trip: {}", e))
            } else {
                Error::Http(e)
            }
        })?;

        self.update_rate_limit(&response).await;

        let status = response.status();

        if status.is_success() {
            let body = response.json::<ChatCompletionResponse>().await?;

            if let Some(ref usage) = body.usage {
                info!(
                    "OpenRouter response: model={}, tokens={}",
                    body.model, usage.total_tokens
                );
            }

            Ok(body)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                warn!("Rate limit exceeded: {}", error_text);
                Err(Error::RateLimit(error_text))
            } else if status.as_u16() == 401 {
                Err(Error::Unauthorized("Invalid API key".to_string()))
            } else {
                Err(Error::Provider(format!(
                    "API error ({}): {}",
                    status, error_text
                )))
            }
        }
    }

    /// Update rate limit state from response headers
    async fn update_rate_limit(&self, response: &reqwest::Response) {
        let mut state = self.rate_limit.write().await;

        if let Some(remaining) = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
        {
            state.remaining = Some(remaining);
        }

        if let Some(reset) = response
            .headers()
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
        {
            state.reset_at = Some(reset);
        }
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn chat(
        &self,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        let request = ChatCompletionRequest {
            model: self.config.default_model.clone(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stop: options.stop,
            tools: None,
            tool_choice: None,
        };

        self.send_request(request).await
    }

    async fn chat_with_tools(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        let request = ChatCompletionRequest {
            model: self.config.default_model.clone(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stop: options.stop,
            tools: Some(tools),
            tool_choice: Some(ToolChoice::Auto("auto".to_string())),
        };

        self.send_request(request).await
    }
}
