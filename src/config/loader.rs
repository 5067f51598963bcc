// Configuration loader
// Loads ~/.refrain/config.toml (or an explicit path), then applies environment overrides

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::CONFIG_DIR_NAME;
use super::provider::{ModelRole, ProviderKind};
use super::settings::Config;

/// Files a configuration was assembled from.
///
/// Loading happens before tracing is installed, so these are logged by the
/// caller afterwards via [`ConfigSources::log`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSources {
    pub env_file: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
}

impl ConfigSources {
    pub fn log(&self) {
        match &self.env_file {
            Some(path) => tracing::debug!("Loaded environment from {}", path.display()),
            None => tracing::debug!("No .env file found"),
        }
        match &self.config_file {
            Some(path) => tracing::debug!("Loaded configuration from {}", path.display()),
            None => tracing::debug!("No configuration file; using defaults and environment"),
        }
    }
}

/// Load configuration from a TOML file and the environment.
///
/// `.env` in the working directory is read first so that variables defined
/// there behave like real environment variables. An explicit `path` must
/// exist; the default `~/.refrain/config.toml` is optional.
pub fn load_config(path: Option<&Path>) -> Result<(Config, ConfigSources)> {
    let mut sources = ConfigSources {
        env_file: dotenvy::dotenv().ok(),
        config_file: None,
    };

    let file = match path {
        Some(p) => Some(p.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };
    let mut config = match &file {
        Some(p) => load_config_file(p)?,
        None => Config::default(),
    };
    sources.config_file = file;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok((config, sources))
}

/// `~/.refrain/config.toml`, if a home directory can be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join("config.toml"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;
    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts `std::env::var` so tests don't touch process state.
/// Blank values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    for role in ModelRole::ALL {
        let (provider_var, model_var) = role.env_vars();
        let binding = config.llm.binding_mut(role);
        if let Some(provider) = get(provider_var) {
            binding.provider = Some(provider);
        }
        if let Some(model) = get(model_var) {
            binding.model = Some(model);
        }
    }

    for kind in [ProviderKind::Together, ProviderKind::Google, ProviderKind::Mistral] {
        if let Some(key) = get(kind.api_key_var()) {
            config.llm.set_api_key(kind, key);
        }
    }

    if let Some(path) = get("AGENT_PERSONALITY_PATH") {
        config.agent_personality_path = Some(PathBuf::from(path));
    }

    // Song pipeline
    if let Some(key) = get("SUNO_API_KEY") {
        config.song.suno.api_key = Some(key);
    }
    if let Some(url) = get("SUNO_CALLBACK_URL") {
        config.song.suno.callback_url = Some(url);
    }
    if let Some(url) = get("SUNO_BASE_URL") {
        config.song.suno.base_url = url;
    }
    if let Some(path) = get("MUSIC_MEMORY_PATH") {
        config.song.memory_path = PathBuf::from(path);
    }
    if let Some(path) = get("MUSIC_OUTPUT_DIR") {
        config.song.output_dir = PathBuf::from(path);
    }

    // News pipeline
    if let Some(key) = get("ELEVENLABS_API_KEY") {
        config.news.voice.api_key = Some(key);
    }
    if let Some(voice) = get("ELEVENLABS_VOICE_ID") {
        config.news.voice.voice_id = Some(voice);
    }
    if let Some(path) = get("NEWS_OUTPUT_DIR") {
        config.news.output_dir = PathBuf::from(path);
    }
    if let Some(path) = get("VOICE_OUTPUT_DIR") {
        config.news.voice_output_dir = PathBuf::from(path);
    }
    if let Some(path) = get("TOPICS_DIR") {
        config.news.topics_dir = PathBuf::from(path);
    }
    if let Some(feeds) = get("RESEARCH_FEED_URLS") {
        config.news.feeds = feeds
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
    }

    if let Some(path) = get("LOG_FILE") {
        config.logging.log_file = Some(PathBuf::from(path));
    }
}
