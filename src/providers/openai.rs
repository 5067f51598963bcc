// OpenAI-compatible chat-completions provider
//
// Together and Mistral both expose the OpenAI `/v1/chat/completions` format,
// so one client covers them; only the base URL and default model differ.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::retry::{with_retry_policy, RetryPolicy};
use super::types::{GenerationOptions, RawResponse};
use super::LlmProvider;

const REQUEST_TIMEOUT_SECS: u64 = 60;

pub const TOGETHER_BASE_URL: &str = "https://api.together.xyz";
pub const MISTRAL_BASE_URL: &str = "https://api.mistral.ai";

/// Chat-completions client for OpenAI-compatible backends.
#[derive(Clone)]
pub struct OpenAICompatProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    provider_name: String,
    options: GenerationOptions,
    retry: RetryPolicy,
}

impl OpenAICompatProvider {
    /// Together AI (hosted open-weight models)
    pub fn new_together(api_key: String, model: String) -> Result<Self> {
        Self::new(api_key, TOGETHER_BASE_URL.to_string(), model, "together".to_string())
    }

    /// Mistral La Plateforme
    pub fn new_mistral(api_key: String, model: String) -> Result<Self> {
        Self::new(api_key, MISTRAL_BASE_URL.to_string(), model, "mistral".to_string())
    }

    fn new(api_key: String, base_url: String, model: String, provider_name: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url,
            model,
            provider_name,
            options: GenerationOptions::default(),
            retry: RetryPolicy::default(),
        })
    }

    /// Point the client at a different endpoint (gateways, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn to_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: Some(self.options.max_tokens),
            temperature: self.options.temperature,
        }
    }

    /// Send a single request (no retry)
    async fn invoke_once(&self, prompt: &str) -> Result<RawResponse> {
        let request = self.to_request(prompt);
        let url = format!("{}/v1/chat/completions", self.base_url);

        tracing::debug!(provider = %self.provider_name, model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {} API", self.provider_name))?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "{} API request failed\n\nStatus: {}\nBody: {}",
                self.provider_name,
                status,
                error_body
            );
        }

        let body: ChatResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} API response", self.provider_name))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .with_context(|| format!("{} returned no choices in response", self.provider_name))?;

        Ok(RawResponse {
            text: choice.message.content.unwrap_or_default(),
            provider: self.provider_name.clone(),
            model: body.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAICompatProvider {
    async fn invoke(&self, prompt: &str) -> Result<RawResponse> {
        with_retry_policy(self.retry, || self.invoke_once(prompt)).await
    }

    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Wire types

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
