// JSON history log
//
// Accepted artifacts are appended to `{"<collection>": [records...]}`. The log
// doubles as generator memory. Other top-level keys in the file are preserved.

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One accepted artifact.
///
/// Serialized flat: `{"id": 3, "song_name": ..., "created_at": "2025-06-01"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub id: u64,

    #[serde(flatten)]
    pub fields: Map<String, Value>,

    /// Creation date, `YYYY-MM-DD`
    #[serde(default)]
    pub created_at: String,
}

impl HistoryRecord {
    /// Record stamped with today's local date.
    pub fn new(id: u64, fields: Map<String, Value>) -> Self {
        Self {
            id,
            fields,
            created_at: Local::now().format("%Y-%m-%d").to_string(),
        }
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Full record as a JSON value (memory input for prompts).
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// File-backed history log for one collection.
///
/// Single writer per file is assumed; there is no cross-process locking.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    collection: String,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            collection: collection.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// All records, oldest first.
    ///
    /// A missing or empty file is a new history. A file that cannot be
    /// parsed is logged and treated as empty as well.
    pub fn read(&self) -> Vec<HistoryRecord> {
        self.load_document().1
    }

    /// The `limit` most recent records, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<HistoryRecord> {
        let records = self.read();
        let skip = records.len().saturating_sub(limit);
        records.into_iter().skip(skip).collect()
    }

    /// Append `fields` as a new record with the next id and today's date.
    pub fn append(&self, fields: Map<String, Value>) -> Result<HistoryRecord> {
        let (mut document, mut records) = self.load_document();
        let record = HistoryRecord::new(next_id(&records), fields);
        records.push(record.clone());

        let records_value =
            serde_json::to_value(&records).context("Failed to serialize history records")?;
        document.insert(self.collection.clone(), records_value);

        let json = serde_json::to_string_pretty(&Value::Object(document))
            .context("Failed to serialize history log")?;
        write_atomic(&self.path, json.as_bytes())?;

        info!(
            path = %self.path.display(),
            id = record.id,
            "Appended history record"
        );
        Ok(record)
    }

    /// Root object and parsed records. Never fails.
    fn load_document(&self) -> (Map<String, Value>, Vec<HistoryRecord>) {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No history file yet; starting a new history");
                return (Map::new(), Vec::new());
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not read history file; treating as empty");
                return (Map::new(), Vec::new());
            }
        };

        if content.trim().is_empty() {
            debug!(path = %self.path.display(), "History file is empty; starting a new history");
            return (Map::new(), Vec::new());
        }

        let mut document = match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!(path = %self.path.display(), "History file is not a JSON object; starting a new history");
                return (Map::new(), Vec::new());
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "History file is corrupted; starting a new history");
                return (Map::new(), Vec::new());
            }
        };

        let records = match document.remove(&self.collection) {
            None => Vec::new(),
            Some(value) => match serde_json::from_value::<Vec<HistoryRecord>>(value) {
                Ok(records) => records,
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        collection = %self.collection,
                        error = %e,
                        "History collection is malformed; starting a new history"
                    );
                    Vec::new()
                }
            },
        };

        (document, records)
    }
}

/// Last record's id + 1, or 1 for an empty history.
pub fn next_id(records: &[HistoryRecord]) -> u64 {
    records.last().map(|r| r.id + 1).unwrap_or(1)
}

/// Write via a sibling temp file and rename, creating parent directories.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "history.json".to_string());
    let tmp_path = parent.join(format!(".{}.tmp", file_name));

    {
        let mut file = fs::File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        file.write_all(contents)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        file.sync_all().ok();
    }

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
