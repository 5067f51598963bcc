// Configuration structs

use super::constants::{
    DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_SHOW_NAME,
    MAX_VALIDATION_ATTEMPTS,
};
use super::provider::{ModelRole, ProviderKind, RoleBinding};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Role bindings and provider credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    pub main: RoleBinding,
    pub thinking: RoleBinding,
    pub validation: RoleBinding,
    pub spare: RoleBinding,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub together_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mistral_api_key: Option<String>,

    /// Per-provider endpoint overrides, keyed by provider name ("together", ...)
    pub base_urls: HashMap<String, String>,

    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            main: RoleBinding::new("together", "deepseek-ai/DeepSeek-V3"),
            thinking: RoleBinding::new("google", "gemini-2.5-pro"),
            validation: RoleBinding::new("together", "meta-llama/Llama-3.3-70B-Instruct-Turbo"),
            spare: RoleBinding::new("together", "deepseek-ai/DeepSeek-V3"),
            together_api_key: None,
            google_api_key: None,
            mistral_api_key: None,
            base_urls: HashMap::new(),
            max_tokens: None,
            temperature: None,
        }
    }
}

impl LlmSettings {
    /// Settings with every role unbound and no credentials.
    pub fn empty() -> Self {
        Self {
            main: RoleBinding::default(),
            thinking: RoleBinding::default(),
            validation: RoleBinding::default(),
            spare: RoleBinding::default(),
            ..Self::default()
        }
    }

    pub fn binding(&self, role: ModelRole) -> &RoleBinding {
        match role {
            ModelRole::Main => &self.main,
            ModelRole::Thinking => &self.thinking,
            ModelRole::Validation => &self.validation,
            ModelRole::Spare => &self.spare,
        }
    }

    pub fn binding_mut(&mut self, role: ModelRole) -> &mut RoleBinding {
        match role {
            ModelRole::Main => &mut self.main,
            ModelRole::Thinking => &mut self.thinking,
            ModelRole::Validation => &mut self.validation,
            ModelRole::Spare => &mut self.spare,
        }
    }

    /// API key for a provider, ignoring blank values.
    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        let key = match kind {
            ProviderKind::Together => self.together_api_key.as_deref(),
            ProviderKind::Google => self.google_api_key.as_deref(),
            ProviderKind::Mistral => self.mistral_api_key.as_deref(),
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn set_api_key(&mut self, kind: ProviderKind, key: String) {
        match kind {
            ProviderKind::Together => self.together_api_key = Some(key),
            ProviderKind::Google => self.google_api_key = Some(key),
            ProviderKind::Mistral => self.mistral_api_key = Some(key),
        }
    }

    pub fn base_url(&self, kind: ProviderKind) -> Option<&str> {
        self.base_urls.get(kind.as_str()).map(String::as_str)
    }
}

/// Suno audio-generation service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SunoSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub model: String,
    pub instrumental: bool,
    pub poll_attempts: u32,
    pub poll_interval_secs: u64,
}

impl Default for SunoSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.sunoapi.org".to_string(),
            callback_url: None,
            model: "V4_5".to_string(),
            instrumental: true,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

/// ElevenLabs text-to-speech service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    pub base_url: String,
    pub model_id: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: None,
            base_url: "https://api.elevenlabs.io".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
        }
    }
}

/// Song pipeline paths and services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SongSettings {
    /// JSON history log, also used as generator memory
    pub memory_path: PathBuf,
    /// Where finished audio files are moved
    pub output_dir: PathBuf,
    pub suno: SunoSettings,
}

impl Default for SongSettings {
    fn default() -> Self {
        Self {
            memory_path: PathBuf::from("media/memory/music_memory.json"),
            output_dir: PathBuf::from("songs"),
            suno: SunoSettings::default(),
        }
    }
}

/// News pipeline paths and services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NewsSettings {
    /// Directory holding `news_memory_<topic>.json`
    pub output_dir: PathBuf,
    /// Directory holding `<topic>_topics.json`
    pub topics_dir: PathBuf,
    pub voice_output_dir: PathBuf,
    /// Research feeds queried concurrently for each topic, as `name=url`
    pub feeds: Vec<String>,
    pub show_name: String,
    pub voice: VoiceSettings,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("media/news"),
            topics_dir: PathBuf::from("config/agent_data"),
            voice_output_dir: PathBuf::from("media/voice/generated_audio"),
            feeds: Vec::new(),
            show_name: DEFAULT_SHOW_NAME.to_string(),
            voice: VoiceSettings::default(),
        }
    }
}

/// Logging output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback level when `REFRAIN_LOG` is unset
    pub level: String,
    /// Optional plain-text log file mirrored alongside stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSettings,

    /// JSON file with `agent.name`, `music_style` and free-form personality traits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_personality_path: Option<PathBuf>,

    /// Validation attempts per run
    pub max_attempts: usize,

    pub song: SongSettings,
    pub news: NewsSettings,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            agent_personality_path: None,
            max_attempts: MAX_VALIDATION_ATTEMPTS,
            song: SongSettings::default(),
            news: NewsSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }
        if self.song.suno.poll_attempts == 0 {
            anyhow::bail!("song.suno.poll_attempts must be at least 1");
        }
        for feed in &self.news.feeds {
            if !feed.contains('=') {
                anyhow::bail!(
                    "Invalid research feed '{}': expected the form name=url",
                    feed
                );
            }
        }
        // Unknown providers are reported by the router at resolution time, so a
        // broken optional role does not prevent startup.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_role_bindings() {
        let llm = LlmSettings::default();
        assert_eq!(llm.main.complete(), Some(("together", "deepseek-ai/DeepSeek-V3")));
        assert_eq!(llm.thinking.complete(), Some(("google", "gemini-2.5-pro")));
        assert_eq!(llm.spare, llm.main);
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let mut llm = LlmSettings::empty();
        llm.set_api_key(ProviderKind::Google, "   ".to_string());
        assert!(llm.api_key(ProviderKind::Google).is_none());
        llm.set_api_key(ProviderKind::Google, "g-key".to_string());
        assert_eq!(llm.api_key(ProviderKind::Google), Some("g-key"));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = Config {
            max_attempts: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_feed() {
        let mut config = Config::default();
        config.news.feeds.push("no-separator".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            max_attempts = 5

            [llm.main]
            provider = "mistral"
            model = "mistral-large-latest"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.llm.main.complete(), Some(("mistral", "mistral-large-latest")));
        assert_eq!(config.llm.thinking.complete(), Some(("google", "gemini-2.5-pro")));
        assert_eq!(config.song.suno.poll_attempts, DEFAULT_POLL_ATTEMPTS);
    }
}
