// Provider-agnostic request options and raw responses

use serde::{Deserialize, Serialize};

/// Text returned by a single model invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    pub text: String,
    /// Provider that actually answered (relevant behind a fallback chain)
    pub provider: String,
    pub model: String,
}

impl RawResponse {
    pub fn new(text: impl Into<String>, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// Sampling options shared by all providers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: crate::config::constants::DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }
}
