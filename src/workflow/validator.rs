// Artifact validation step

use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{debug, error};

use super::parse::parse_json_object;
use super::template::render;
use super::types::{Artifact, GenerationContext, ValidationVerdict};
use crate::router::ModelHandle;

/// Judges a candidate. Never fails: problems become an unfavorable verdict.
#[async_trait]
pub trait ArtifactValidator<A: Artifact>: Send + Sync {
    async fn validate(&self, candidate: &A, context: &GenerationContext) -> ValidationVerdict;
}

/// Validator backed by a model handle and a prompt template.
///
/// Template variables: everything from the context, the candidate's
/// `template_fields`, `{candidate}` (pretty JSON) and `{size}`.
pub struct LlmArtifactValidator<A> {
    model: ModelHandle,
    template: String,
    _artifact: PhantomData<fn() -> A>,
}

impl<A: Artifact> LlmArtifactValidator<A> {
    pub fn new(model: ModelHandle, template: impl Into<String>) -> Self {
        Self {
            model,
            template: template.into(),
            _artifact: PhantomData,
        }
    }

    pub fn render_prompt(&self, candidate: &A, context: &GenerationContext) -> String {
        let mut vars = context.template_vars();
        for (key, value) in candidate.template_fields() {
            vars.insert(key.to_string(), value);
        }
        vars.insert("size".into(), candidate.size_metric().to_string());
        vars.insert(
            "candidate".into(),
            serde_json::to_string_pretty(candidate).unwrap_or_default(),
        );
        render(&self.template, &vars)
    }
}

/// Read a verdict out of a model response.
pub fn parse_verdict(text: &str) -> Result<ValidationVerdict, String> {
    let map = parse_json_object(text)?;
    let verdict: ValidationVerdict =
        serde_json::from_value(Value::Object(map)).map_err(|e| e.to_string())?;
    Ok(verdict.normalized())
}

#[async_trait]
impl<A: Artifact> ArtifactValidator<A> for LlmArtifactValidator<A> {
    async fn validate(&self, candidate: &A, context: &GenerationContext) -> ValidationVerdict {
        let prompt = self.render_prompt(candidate, context);
        debug!(kind = A::KIND, model = self.model.model(), "Invoking validation model");

        let response = match self.model.invoke(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                error!(kind = A::KIND, error = %e, "Validation model call failed");
                return ValidationVerdict::processing_error();
            }
        };

        match parse_verdict(&response.text) {
            Ok(verdict) => verdict,
            Err(detail) => {
                error!(kind = A::KIND, error = %detail, "Could not parse validation response");
                ValidationVerdict::processing_error()
            }
        }
    }
}
