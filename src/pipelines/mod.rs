// Song and news pipelines
//
// Each pipeline wires a RetryLoop, a PostProcessor and its side effect for one
// run. Batches run sequentially; a failed run is logged and the batch moves on.

pub mod news;
pub mod prompts;
pub mod song;

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::warn;

use crate::errors::MediaError;
use crate::history::HistoryRecord;
use crate::media::PublishedMedia;

pub use news::{clean_for_voice, NewsArticle, NewsPipeline};
pub use song::{SongPipeline, SongPrompt};

/// Agent identity and style, loaded from the personality JSON file.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub name: String,
    pub music_style: Value,
    /// The whole personality document
    pub personality: Value,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            name: "Refrain".to_string(),
            music_style: Value::Null,
            personality: Value::Null,
        }
    }
}

impl AgentProfile {
    /// Parse `{"agent": {"name": ...}, "music_style": ..., ...}`.
    pub fn from_value(personality: Value) -> Result<Self> {
        let name = personality
            .pointer("/agent/name")
            .and_then(Value::as_str)
            .context("Agent personality is missing agent.name")?
            .to_string();
        let music_style = personality.get("music_style").cloned().unwrap_or(Value::Null);
        Ok(Self {
            name,
            music_style,
            personality,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read agent personality {}", path.display()))?;
        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse agent personality {}", path.display()))?;
        Self::from_value(value)
    }

    /// Load from `path` when configured, otherwise fall back to the default profile.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                warn!("AGENT_PERSONALITY_PATH is not set; using the default agent profile");
                Ok(Self::default())
            }
        }
    }
}

/// How one pipeline run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Accepted and committed to history. `media` is the side-effect result.
    Completed {
        record: HistoryRecord,
        media: Result<PublishedMedia, MediaError>,
    },
    /// Validation attempts ran out; nothing was written.
    Exhausted { attempts: usize },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { media: Ok(_), .. })
    }
}

/// Tally of a sequential batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub publish_failed: usize,
    pub exhausted: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, result: &Result<RunOutcome>) {
        match result {
            Ok(RunOutcome::Completed { media: Ok(_), .. }) => self.completed += 1,
            Ok(RunOutcome::Completed { media: Err(_), .. }) => self.publish_failed += 1,
            Ok(RunOutcome::Exhausted { .. }) => self.exhausted += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.completed + self.publish_failed + self.exhausted + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.completed == self.total()
    }
}
