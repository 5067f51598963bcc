// Multi-provider LLM support
//
// This module provides an abstraction layer over the hosted model backends
// (Together, Google Gemini, Mistral) so the router and workflow code only ever
// see a single prompt-in, text-out interface.

use anyhow::Result;
use async_trait::async_trait;

pub mod types;

// Provider implementations
pub mod gemini;
pub mod openai;

// Provider factory
pub mod factory;

// Ordered failover across providers
pub mod fallback_chain;

pub mod retry;

// Re-export commonly used types
pub use factory::{create_provider, default_factory, ProviderFactory, ResolvedBinding};
pub use fallback_chain::FallbackChain;
pub use retry::{with_retry_policy, RetryPolicy};
pub use types::{GenerationOptions, RawResponse};

/// Trait for LLM providers
///
/// Every backend (and composite such as [`FallbackChain`]) implements this
/// trait. Implementations retry transient transport failures internally;
/// an `Err` means the provider gave up.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a single prompt and wait for the complete text response
    async fn invoke(&self, prompt: &str) -> Result<RawResponse>;

    /// Provider name (e.g., "together", "google", "mistral")
    fn name(&self) -> &str;

    /// Model identifier sent to the backend
    fn model(&self) -> &str;
}
