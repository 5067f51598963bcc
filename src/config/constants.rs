// Project-wide constants
//
// Centralised here so magic values have one source of truth.
// Import via `use crate::config::constants::*;`.

/// Validation attempts per run before the loop gives up.
pub const MAX_VALIDATION_ATTEMPTS: usize = 3;

/// How many history records are fed back to the generator as memory.
pub const MEMORY_LIMIT: usize = 5;

/// Suno rejects longer prompts in non-custom mode.
pub const SUNO_PROMPT_LIMIT: usize = 400;

/// Poll budget for a Suno generation task (60 × 10s ≈ 10 minutes).
pub const DEFAULT_POLL_ATTEMPTS: u32 = 60;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Recommendation attached to a verdict when the validator itself failed.
pub const PROCESSING_ERROR_RECOMMENDATION: &str = "validation failed due to a processing error";

/// Directory under `$HOME` holding `config.toml`.
pub const CONFIG_DIR_NAME: &str = ".refrain";

/// Default maximum tokens for model requests.
pub const DEFAULT_MAX_TOKENS: u32 = 8000;

/// Collection keys inside the JSON history logs.
pub const SONG_HISTORY_KEY: &str = "music_generation_history";
pub const NEWS_HISTORY_KEY: &str = "news_history";

/// Show name used by the news anchor prompt.
pub const DEFAULT_SHOW_NAME: &str = "Xyber Radio";
