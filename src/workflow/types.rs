// Workflow types: artifacts, generation context, validation verdicts

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::constants::{MEMORY_LIMIT, PROCESSING_ERROR_RECOMMENDATION};

/// A structured candidate produced by a generation model.
///
/// Serde handles presence and basic typing of the required fields; `check`
/// covers constraints serde cannot express (ranges, non-empty strings).
pub trait Artifact: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Short name used in logs and error messages ("song", "article")
    const KIND: &'static str;

    /// JSON keys that must be present and non-null in a model response
    const REQUIRED_FIELDS: &'static [&'static str];

    fn check(&self) -> Result<(), String> {
        Ok(())
    }

    /// Named values exposed to the validation prompt template
    fn template_fields(&self) -> Vec<(&'static str, String)>;

    /// Size of the main text body, reported to the validator
    fn size_metric(&self) -> usize;

    /// Text handed back to the generator when this candidate is rejected
    fn revision_text(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Immutable inputs for one pipeline run.
///
/// Built once with the `with_*` constructors; between retries a new context is
/// derived via [`GenerationContext::with_feedback`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationContext {
    memory: Vec<Value>,
    style: Value,
    personality: Value,
    agent_name: String,
    extras: BTreeMap<String, String>,
    feedback: Option<String>,
    previous_draft: Option<Draft>,
}

/// Rejected candidate shown to the generator on the next attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub text: String,
    pub size: usize,
}

impl GenerationContext {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            ..Self::default()
        }
    }

    /// Prior artifacts, oldest first. Only the most recent `MEMORY_LIMIT` are kept.
    pub fn with_memory(mut self, memory: Vec<Value>) -> Self {
        let skip = memory.len().saturating_sub(MEMORY_LIMIT);
        self.memory = memory.into_iter().skip(skip).collect();
        self
    }

    pub fn with_style(mut self, style: Value) -> Self {
        self.style = style;
        self
    }

    pub fn with_personality(mut self, personality: Value) -> Self {
        self.personality = personality;
        self
    }

    /// Pipeline-specific template input (research report, topic list, ...)
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Derive a context carrying `feedback`, replacing any earlier feedback.
    pub fn with_feedback(&self, feedback: impl Into<String>) -> Self {
        Self {
            feedback: Some(feedback.into()),
            ..self.clone()
        }
    }

    /// Derive a context carrying the last rejected candidate.
    pub fn with_previous_draft(&self, text: impl Into<String>, size: usize) -> Self {
        Self {
            previous_draft: Some(Draft {
                text: text.into(),
                size,
            }),
            ..self.clone()
        }
    }

    pub fn memory(&self) -> &[Value] {
        &self.memory
    }

    pub fn style(&self) -> &Value {
        &self.style
    }

    pub fn personality(&self) -> &Value {
        &self.personality
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn previous_draft(&self) -> Option<&Draft> {
        self.previous_draft.as_ref()
    }

    /// Variables for prompt rendering.
    ///
    /// `memory`, `style`, `personality`, `agent_name`, `feedback`,
    /// `previous_draft`, `previous_draft_size`, plus every extra. Structured
    /// values are rendered as pretty JSON, strings verbatim.
    pub fn template_vars(&self) -> BTreeMap<String, String> {
        let mut vars = self.extras.clone();
        vars.insert("memory".into(), render_value(&Value::Array(self.memory.clone())));
        vars.insert("style".into(), render_value(&self.style));
        vars.insert("personality".into(), render_value(&self.personality));
        vars.insert("agent_name".into(), self.agent_name.clone());
        vars.insert("feedback".into(), self.feedback.clone().unwrap_or_default());
        let (draft, size) = match &self.previous_draft {
            Some(draft) => (draft.text.clone(), draft.size),
            None => (String::new(), 0),
        };
        vars.insert("previous_draft".into(), draft);
        vars.insert("previous_draft_size".into(), size.to_string());
        vars
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Outcome of validating one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    #[serde(alias = "song_prompt_validated")]
    pub validated: bool,
    #[serde(default, deserialize_with = "string_or_list")]
    pub recommendations: String,
}

impl ValidationVerdict {
    pub fn accepted() -> Self {
        Self {
            validated: true,
            recommendations: String::new(),
        }
    }

    pub fn rejected(recommendations: impl Into<String>) -> Self {
        Self {
            validated: false,
            recommendations: recommendations.into(),
        }
    }

    /// Fixed unfavorable verdict used when validation itself fails.
    pub fn processing_error() -> Self {
        Self::rejected(PROCESSING_ERROR_RECOMMENDATION)
    }

    /// Recommendations are empty exactly when the candidate is accepted.
    pub fn normalized(self) -> Self {
        if self.validated {
            Self::accepted()
        } else {
            self
        }
    }
}

/// Models sometimes return recommendations as a list of bullet strings.
fn string_or_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Recs {
        One(String),
        Many(Vec<String>),
        Missing(()),
    }

    Ok(match Recs::deserialize(deserializer)? {
        Recs::One(s) => s,
        Recs::Many(items) => items.join("\n"),
        Recs::Missing(()) => String::new(),
    })
}
