// Suno audio generation
//
// Submit a generation task, poll `record-info` until it settles, download
// every produced track into the output directory.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{file_stem, MediaSideEffect, PublishedMedia};
use crate::config::constants::SUNO_PROMPT_LIMIT;
use crate::config::SunoSettings;
use crate::errors::MediaError;

const SERVICE: &str = "suno";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Task statuses after which polling stops without output.
const FAILURE_STATUSES: [&str; 4] = [
    "CREATE_TASK_FAILED",
    "GENERATE_AUDIO_FAILED",
    "CALLBACK_EXCEPTION",
    "SENSITIVE_WORD_ERROR",
];

pub struct SunoPublisher {
    client: Client,
    api_key: String,
    settings: SunoSettings,
    output_dir: PathBuf,
}

impl SunoPublisher {
    pub fn new(settings: SunoSettings, output_dir: impl Into<PathBuf>) -> Result<Self, MediaError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(MediaError::NotConfigured("SUNO_API_KEY"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|source| MediaError::Request { service: SERVICE, source })?;

        Ok(Self {
            client,
            api_key,
            settings,
            output_dir: output_dir.into(),
        })
    }

    fn base_url(&self) -> &str {
        self.settings.base_url.trim_end_matches('/')
    }

    /// Build the task payload from a song candidate.
    fn to_request(&self, candidate: &Value) -> Result<GenerateRequest, MediaError> {
        let prompt = candidate
            .get("song_prompt")
            .and_then(Value::as_str)
            .ok_or(MediaError::MissingField("song_prompt"))?;

        Ok(GenerateRequest {
            prompt: truncate_chars(prompt, SUNO_PROMPT_LIMIT),
            style: String::new(),
            title: String::new(),
            custom_mode: false,
            instrumental: self.settings.instrumental,
            model: self.settings.model.clone(),
            negative_tags: str_field(candidate, "negativeTags"),
            vocal_gender: str_field(candidate, "vocalGender"),
            style_weight: num_field(candidate, "styleWeight"),
            weirdness_constraint: num_field(candidate, "weirdnessConstraint"),
            audio_weight: num_field(candidate, "audioWeight"),
            call_back_url: self.settings.callback_url.clone().unwrap_or_default(),
        })
    }

    async fn submit(&self, request: &GenerateRequest) -> Result<String, MediaError> {
        let url = format!("{}/api/v1/generate", self.base_url());
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|source| MediaError::Request { service: SERVICE, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<TaskCreated> = response
            .json()
            .await
            .map_err(|source| MediaError::Request { service: SERVICE, source })?;

        if envelope.code != 200 {
            return Err(MediaError::TaskFailed {
                service: SERVICE,
                status: envelope.code.to_string(),
                message: envelope.msg.unwrap_or_default(),
            });
        }

        envelope
            .data
            .and_then(|d| d.task_id)
            .ok_or(MediaError::MissingField("taskId"))
    }

    /// Poll until SUCCESS, a failure status, or the attempt budget runs out.
    async fn wait_for_tracks(&self, task_id: &str) -> Result<Vec<Track>, MediaError> {
        let url = format!("{}/api/v1/generate/record-info", self.base_url());
        let attempts = self.settings.poll_attempts;
        let interval = Duration::from_secs(self.settings.poll_interval_secs);

        for attempt in 1..=attempts {
            tokio::time::sleep(interval).await;
            debug!(task_id, attempt, attempts, "Polling Suno task");

            let response = match self
                .client
                .get(&url)
                .query(&[("taskId", task_id)])
                .bearer_auth(&self.api_key)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(task_id, attempt, error = %e, "Suno poll request failed");
                    continue;
                }
            };

            if !response.status().is_success() {
                warn!(task_id, attempt, status = %response.status(), "Suno poll returned an error status");
                continue;
            }

            let envelope: Envelope<TaskRecord> = match response.json().await {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(task_id, attempt, error = %e, "Could not parse Suno poll response");
                    continue;
                }
            };

            if envelope.code != 200 {
                warn!(task_id, attempt, message = ?envelope.msg, "Suno API error while polling");
                continue;
            }

            let record = envelope.data.unwrap_or_default();
            let status = record.status.unwrap_or_default();

            if status == "SUCCESS" {
                info!(task_id, "Suno generation complete");
                return Ok(record.response.map(|r| r.suno_data).unwrap_or_default());
            }

            if FAILURE_STATUSES.contains(&status.as_str()) {
                return Err(MediaError::TaskFailed {
                    service: SERVICE,
                    status,
                    message: record.error_message.unwrap_or_default(),
                });
            }

            debug!(task_id, status = %status, "Suno generation in progress");
        }

        Err(MediaError::PollTimeout {
            service: SERVICE,
            attempts,
        })
    }

    async fn download(&self, tracks: Vec<Track>) -> Result<PublishedMedia, MediaError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let mut published = PublishedMedia::default();

        for (index, track) in tracks.into_iter().enumerate() {
            let title = track.title.unwrap_or_else(|| "untitled_song".to_string());
            let Some(audio_url) = track.audio_url.filter(|u| !u.is_empty()) else {
                warn!(title = %title, "Suno track has no audio URL");
                continue;
            };

            let response = match self.client.get(&audio_url).send().await {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    warn!(title = %title, status = %r.status(), "Failed to download track");
                    continue;
                }
                Err(e) => {
                    warn!(title = %title, error = %e, "Failed to download track");
                    continue;
                }
            };

            let bytes = response
                .bytes()
                .await
                .map_err(|source| MediaError::Request { service: SERVICE, source })?;
            let mut path = self.output_dir.join(format!("{}.mp3", file_stem(&title)));
            if published.files.contains(&path) {
                // Variants of one task usually share a title
                path = self.output_dir.join(format!("{}_{}.mp3", file_stem(&title), index + 1));
            }
            tokio::fs::write(&path, &bytes).await?;
            info!(path = %path.display(), "Saved track");

            published.files.push(path);
            published.titles.push(title);
        }

        if published.files.is_empty() {
            return Err(MediaError::NoOutput { service: SERVICE });
        }
        Ok(published)
    }
}

#[async_trait]
impl MediaSideEffect for SunoPublisher {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn publish(&self, candidate: &Value) -> Result<PublishedMedia, MediaError> {
        let request = self.to_request(candidate)?;
        let task_id = self.submit(&request).await?;
        info!(task_id = %task_id, "Suno generation task created");
        let tracks = self.wait_for_tracks(&task_id).await?;
        self.download(tracks).await
    }
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

fn str_field(candidate: &Value, key: &str) -> String {
    candidate
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn num_field(candidate: &Value, key: &str) -> f64 {
    candidate.get(key).and_then(Value::as_f64).unwrap_or_default()
}

// Wire types

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    prompt: String,
    style: String,
    title: String,
    custom_mode: bool,
    instrumental: bool,
    model: String,
    negative_tags: String,
    vocal_gender: String,
    style_weight: f64,
    weirdness_constraint: f64,
    audio_weight: f64,
    call_back_url: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskCreated {
    task_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    status: Option<String>,
    response: Option<TaskResponse>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskResponse {
    #[serde(default)]
    suno_data: Vec<Track>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Track {
    audio_url: Option<String>,
    title: Option<String>,
}
