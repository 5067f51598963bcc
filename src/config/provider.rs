// Model roles and provider bindings
//
// A role is a logical model slot ("main", "thinking", "validation", "spare").
// Each role is bound to a provider string plus a model name in the settings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical model slot used by the pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    Main,
    Thinking,
    Validation,
    Spare,
}

impl ModelRole {
    pub const ALL: [ModelRole; 4] = [
        ModelRole::Main,
        ModelRole::Thinking,
        ModelRole::Validation,
        ModelRole::Spare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Thinking => "thinking",
            Self::Validation => "validation",
            Self::Spare => "spare",
        }
    }

    /// Environment variables holding (provider, model name) for this role.
    pub fn env_vars(&self) -> (&'static str, &'static str) {
        match self {
            Self::Main => ("MODEL_PROVIDER", "MODEL_NAME"),
            Self::Thinking => ("MODEL_PROVIDER_THINKING", "MODEL_NAME_THINKING"),
            Self::Validation => ("MODEL_VALIDATION_PROVIDER", "MODEL_VALIDATION_NAME"),
            Self::Spare => ("MODEL_PROVIDER_SPARE", "MODEL_NAME_SPARE"),
        }
    }

    /// Optional roles degrade to a warning when they cannot be resolved.
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Thinking | Self::Validation)
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Together,
    Google,
    Mistral,
}

impl ProviderKind {
    /// Parse a provider string (case-insensitive). `None` for unknown backends.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "together" => Some(Self::Together),
            "google" => Some(Self::Google),
            "mistral" => Some(Self::Mistral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Together => "together",
            Self::Google => "google",
            Self::Mistral => "mistral",
        }
    }

    /// Name of the environment variable carrying this provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::Together => "TOGETHER_API_KEY",
            Self::Google => "GOOGLE_API_KEY",
            Self::Mistral => "MISTRAL_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (provider, model) pair for one role. Either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl RoleBinding {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            model: Some(model.into()),
        }
    }

    /// Both halves present and non-blank.
    pub fn complete(&self) -> Option<(&str, &str)> {
        let provider = self.provider.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let model = self.model.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((provider, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_case_insensitive() {
        assert_eq!(ProviderKind::parse("Together"), Some(ProviderKind::Together));
        assert_eq!(ProviderKind::parse(" GOOGLE "), Some(ProviderKind::Google));
        assert_eq!(ProviderKind::parse("mistral"), Some(ProviderKind::Mistral));
        assert_eq!(ProviderKind::parse("openai"), None);
    }

    #[test]
    fn test_binding_complete_rejects_blank_halves() {
        assert!(RoleBinding::new("together", "").complete().is_none());
        assert!(RoleBinding::default().complete().is_none());
        assert_eq!(
            RoleBinding::new("google", "gemini-2.5-pro").complete(),
            Some(("google", "gemini-2.5-pro"))
        );
    }

    #[test]
    fn test_role_binding_toml_roundtrip() {
        let binding = RoleBinding::new("together", "deepseek-ai/DeepSeek-V3");
        let text = toml::to_string(&binding).unwrap();
        let decoded: RoleBinding = toml::from_str(&text).unwrap();
        assert_eq!(binding, decoded);
    }

    #[test]
    fn test_optional_roles() {
        assert!(!ModelRole::Main.is_optional());
        assert!(!ModelRole::Spare.is_optional());
        assert!(ModelRole::Thinking.is_optional());
        assert!(ModelRole::Validation.is_optional());
    }
}
