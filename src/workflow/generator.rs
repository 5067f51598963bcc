// Artifact generation step

use async_trait::async_trait;
use std::marker::PhantomData;
use tracing::debug;

use super::parse::parse_artifact;
use super::template::render;
use super::types::{Artifact, GenerationContext};
use crate::errors::WorkflowError;
use crate::router::ModelHandle;

/// Produces one candidate per call. No I/O beyond the model invocation.
#[async_trait]
pub trait ArtifactGenerator<A: Artifact>: Send + Sync {
    async fn generate(&self, context: &GenerationContext) -> Result<A, WorkflowError>;
}

/// Generator backed by a model handle and a prompt template.
///
/// The caller picks the handle (normally `ModelRouter::thinking_or_main`).
pub struct LlmArtifactGenerator<A> {
    model: ModelHandle,
    template: String,
    _artifact: PhantomData<fn() -> A>,
}

impl<A: Artifact> LlmArtifactGenerator<A> {
    pub fn new(model: ModelHandle, template: impl Into<String>) -> Self {
        Self {
            model,
            template: template.into(),
            _artifact: PhantomData,
        }
    }

    pub fn render_prompt(&self, context: &GenerationContext) -> String {
        render(&self.template, &context.template_vars())
    }
}

#[async_trait]
impl<A: Artifact> ArtifactGenerator<A> for LlmArtifactGenerator<A> {
    async fn generate(&self, context: &GenerationContext) -> Result<A, WorkflowError> {
        let prompt = self.render_prompt(context);
        debug!(kind = A::KIND, model = self.model.model(), "Invoking generation model");

        let response = self
            .model
            .invoke(&prompt)
            .await
            .map_err(WorkflowError::Model)?;

        debug!(kind = A::KIND, provider = %response.provider, "Generation response received");
        parse_artifact::<A>(&response.text)
    }
}
