// Provider factory
//
// Creates LLM providers from a fully resolved role binding

use anyhow::Result;
use std::sync::Arc;

use super::gemini::GeminiProvider;
use super::openai::OpenAICompatProvider;
use super::types::GenerationOptions;
use super::LlmProvider;
use crate::config::{ModelRole, ProviderKind};

/// Everything needed to construct a provider for one role.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBinding {
    pub role: ModelRole,
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: String,
    /// Endpoint override; `None` uses the provider's public API
    pub base_url: Option<String>,
    pub options: GenerationOptions,
}

/// Constructor used by the router. Swappable so tests can inject fakes.
pub type ProviderFactory =
    Arc<dyn Fn(&ResolvedBinding) -> Result<Arc<dyn LlmProvider>> + Send + Sync>;

/// Create a provider for a resolved binding.
pub fn create_provider(binding: &ResolvedBinding) -> Result<Arc<dyn LlmProvider>> {
    match binding.kind {
        ProviderKind::Together => {
            let mut provider =
                OpenAICompatProvider::new_together(binding.api_key.clone(), binding.model.clone())?
                    .with_options(binding.options);
            if let Some(url) = &binding.base_url {
                provider = provider.with_base_url(url.clone());
            }
            Ok(Arc::new(provider))
        }

        ProviderKind::Mistral => {
            let mut provider =
                OpenAICompatProvider::new_mistral(binding.api_key.clone(), binding.model.clone())?
                    .with_options(binding.options);
            if let Some(url) = &binding.base_url {
                provider = provider.with_base_url(url.clone());
            }
            Ok(Arc::new(provider))
        }

        ProviderKind::Google => {
            let mut provider = GeminiProvider::new(binding.api_key.clone(), binding.model.clone())?
                .with_options(binding.options);
            if let Some(url) = &binding.base_url {
                provider = provider.with_base_url(url.clone());
            }
            Ok(Arc::new(provider))
        }
    }
}

/// Factory backed by the real HTTP providers.
pub fn default_factory() -> ProviderFactory {
    Arc::new(create_provider)
}
