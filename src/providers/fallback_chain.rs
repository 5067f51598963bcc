// Fallback chain
//
// Tries providers in order until one answers. Used by the router to pair the
// main model with the spare.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use super::types::RawResponse;
use super::LlmProvider;

pub struct FallbackChain {
    providers: Vec<Arc<dyn LlmProvider>>,
    name: String,
}

impl FallbackChain {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        let name = providers
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join("->");
        Self { providers, name }
    }
}

#[async_trait]
impl LlmProvider for FallbackChain {
    async fn invoke(&self, prompt: &str) -> Result<RawResponse> {
        let mut last_error = None;

        for (idx, provider) in self.providers.iter().enumerate() {
            match provider.invoke(prompt).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if idx + 1 < self.providers.len() {
                        warn!(
                            provider = provider.name(),
                            model = provider.model(),
                            error = %e,
                            "Provider failed, falling back to next"
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Fallback chain has no providers")))
    }

    fn name(&self) -> &str {
        &self.name
    }

    /// Model of the primary provider
    fn model(&self) -> &str {
        self.providers.first().map(|p| p.model()).unwrap_or("")
    }
}
