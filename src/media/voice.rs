// ElevenLabs text-to-speech for news articles

use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use super::{file_stem, MediaSideEffect, PublishedMedia};
use crate::config::VoiceSettings;
use crate::errors::MediaError;

const SERVICE: &str = "elevenlabs";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Synthesizes the `content` field of an article into an mp3 file.
pub struct VoiceSynthesizer {
    client: Client,
    api_key: String,
    voice_id: String,
    settings: VoiceSettings,
    output_dir: PathBuf,
    file_prefix: String,
}

impl VoiceSynthesizer {
    pub fn new(settings: VoiceSettings, output_dir: impl Into<PathBuf>) -> Result<Self, MediaError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(MediaError::NotConfigured("ELEVENLABS_API_KEY"))?;
        let voice_id = settings
            .voice_id
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or(MediaError::NotConfigured("ELEVENLABS_VOICE_ID"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|source| MediaError::Request { service: SERVICE, source })?;

        Ok(Self {
            client,
            api_key,
            voice_id,
            settings,
            output_dir: output_dir.into(),
            file_prefix: "news".to_string(),
        })
    }

    /// Prefix for generated file names (the topic, usually)
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    fn output_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        self.output_dir
            .join(format!("{}_{}.mp3", file_stem(&self.file_prefix), stamp))
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[async_trait]
impl MediaSideEffect for VoiceSynthesizer {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn publish(&self, candidate: &Value) -> Result<PublishedMedia, MediaError> {
        let text = candidate
            .get("content")
            .and_then(Value::as_str)
            .ok_or(MediaError::MissingField("content"))?;
        let title = candidate
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.voice_id
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&SpeechRequest {
                text,
                model_id: &self.settings.model_id,
            })
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

        let audio = response
            .bytes()
            .await
            .map_err(|source| MediaError::Request { service: SERVICE, source })?;
        if audio.is_empty() {
            return Err(MediaError::NoOutput { service: SERVICE });
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_path();
        tokio::fs::write(&path, &audio).await?;
        info!(path = %path.display(), bytes = audio.len(), "Saved voice track");

        Ok(PublishedMedia {
            files: vec![path],
            titles: vec![title],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key_and_voice() {
        let missing_key = VoiceSynthesizer::new(VoiceSettings::default(), "out");
        assert!(matches!(missing_key, Err(MediaError::NotConfigured("ELEVENLABS_API_KEY"))));

        let settings = VoiceSettings {
            api_key: Some("k".into()),
            ..VoiceSettings::default()
        };
        let missing_voice = VoiceSynthesizer::new(settings, "out");
        assert!(matches!(missing_voice, Err(MediaError::NotConfigured("ELEVENLABS_VOICE_ID"))));
    }

    #[test]
    fn test_output_path_uses_prefix() {
        let settings = VoiceSettings {
            api_key: Some("k".into()),
            voice_id: Some("v".into()),
            ..VoiceSettings::default()
        };
        let synth = VoiceSynthesizer::new(settings, "out").unwrap().with_file_prefix("AI Robotics");
        let name = synth.output_path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("AI_Robotics_"));
        assert!(name.ends_with(".mp3"));
    }
}
