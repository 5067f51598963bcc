// Downstream media side effects
//
// Called after an accepted artifact has been written to history.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

use crate::errors::MediaError;

pub mod suno;
pub mod voice;

pub use suno::SunoPublisher;
pub use voice::VoiceSynthesizer;

/// Files produced by a side effect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishedMedia {
    pub files: Vec<PathBuf>,
    pub titles: Vec<String>,
}

/// Turns an accepted artifact (as JSON) into media.
#[async_trait]
pub trait MediaSideEffect: Send + Sync {
    /// Service name for logs
    fn name(&self) -> &str;

    async fn publish(&self, candidate: &Value) -> Result<PublishedMedia, MediaError>;
}

/// Turn a title into a file stem: spaces become underscores, path separators dropped.
pub(crate) fn file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' | ':' => '-',
            other => other,
        })
        .collect();
    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem
    }
}
