// Configuration module
// Public interface for configuration loading

pub mod constants;
mod loader;
mod provider;
mod settings;

pub use loader::{apply_env_overrides, default_config_path, load_config, ConfigSources};
pub use provider::{ModelRole, ProviderKind, RoleBinding};
pub use settings::{
    Config, LlmSettings, LoggingConfig, NewsSettings, SongSettings, SunoSettings, VoiceSettings,
};
