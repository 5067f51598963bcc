// Post-processing of accepted artifacts
//
// commit: append to the history log. publish: run the media side effect.
// History is written first; a failed publish leaves the record in place.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::errors::MediaError;
use crate::history::{HistoryRecord, HistoryStore};
use crate::media::{MediaSideEffect, PublishedMedia};
use crate::workflow::Artifact;

/// Result of [`PostProcessor::finish`].
#[derive(Debug)]
pub struct Finished {
    pub record: HistoryRecord,
    pub media: Result<PublishedMedia, MediaError>,
}

pub struct PostProcessor {
    collection: String,
    side_effect: Option<Arc<dyn MediaSideEffect>>,
}

impl PostProcessor {
    /// Post-processor writing into the `collection` key of history files.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            side_effect: None,
        }
    }

    pub fn with_side_effect(mut self, side_effect: Arc<dyn MediaSideEffect>) -> Self {
        self.side_effect = Some(side_effect);
        self
    }

    /// Append `candidate` to the history log at `history_path`.
    pub fn commit<A: Artifact>(&self, candidate: &A, history_path: &Path) -> Result<HistoryRecord> {
        let fields = match serde_json::to_value(candidate).context("Failed to serialize artifact")? {
            Value::Object(map) => map,
            other => anyhow::bail!("{} artifact serialized to non-object JSON: {}", A::KIND, other),
        };
        HistoryStore::new(history_path, self.collection.clone()).append(fields)
    }

    /// Run the side effect, if any. Without one, nothing is produced.
    pub async fn publish<A: Artifact>(&self, candidate: &A) -> Result<PublishedMedia, MediaError> {
        let Some(side_effect) = &self.side_effect else {
            return Ok(PublishedMedia::default());
        };
        let value = serde_json::to_value(candidate).unwrap_or(Value::Null);
        side_effect.publish(&value).await
    }

    /// Commit, then publish. Only a history write failure is an `Err`.
    pub async fn finish<A: Artifact>(&self, candidate: &A, history_path: &Path) -> Result<Finished> {
        let record = self.commit(candidate, history_path)?;
        info!(kind = A::KIND, id = record.id, "Artifact committed to history");

        let media = self.publish(candidate).await;
        match &media {
            Ok(published) => info!(kind = A::KIND, files = ?published.files, "Media published"),
            Err(e) => error!(kind = A::KIND, id = record.id, error = %e, "Media side effect failed"),
        }

        Ok(Finished { record, media })
    }
}
