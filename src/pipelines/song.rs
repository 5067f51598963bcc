// Song-prompt pipeline
//
// memory (last songs) → RetryLoop<SongPrompt> → history → Suno

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use super::{prompts, AgentProfile, BatchSummary, RunOutcome};
use crate::config::constants::{MEMORY_LIMIT, SONG_HISTORY_KEY};
use crate::errors::RouterError;
use crate::history::HistoryStore;
use crate::media::MediaSideEffect;
use crate::postprocess::PostProcessor;
use crate::router::ModelRouter;
use crate::workflow::{
    Artifact, ArtifactGenerator, ArtifactValidator, GenerationContext, LlmArtifactGenerator,
    LlmArtifactValidator, LoopOutcome, RetryLoop,
};

/// Structured prompt for one instrumental track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongPrompt {
    pub song_name: String,
    pub song_prompt: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub style: String,
    #[serde(rename = "negativeTags")]
    pub negative_tags: String,
    #[serde(rename = "vocalGender")]
    pub vocal_gender: String,
    #[serde(rename = "styleWeight")]
    pub style_weight: f64,
    #[serde(rename = "weirdnessConstraint")]
    pub weirdness_constraint: f64,
    #[serde(rename = "audioWeight")]
    pub audio_weight: f64,
}

impl Artifact for SongPrompt {
    const KIND: &'static str = "song";
    const REQUIRED_FIELDS: &'static [&'static str] = &[
        "song_name",
        "song_prompt",
        "negativeTags",
        "vocalGender",
        "styleWeight",
        "weirdnessConstraint",
        "audioWeight",
    ];

    fn check(&self) -> Result<(), String> {
        if self.song_name.trim().is_empty() {
            return Err("song_name is empty".into());
        }
        if self.song_prompt.trim().is_empty() {
            return Err("song_prompt is empty".into());
        }
        if !matches!(self.vocal_gender.trim().to_lowercase().as_str(), "m" | "f") {
            return Err(format!("vocalGender must be \"m\" or \"f\", got {:?}", self.vocal_gender));
        }
        for (name, value) in [
            ("styleWeight", self.style_weight),
            ("weirdnessConstraint", self.weirdness_constraint),
            ("audioWeight", self.audio_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be within [0, 1], got {}", name, value));
            }
        }
        Ok(())
    }

    fn template_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("song_name", self.song_name.clone()),
            ("song_prompt", self.song_prompt.clone()),
            ("negativeTags", self.negative_tags.clone()),
            ("vocalGender", self.vocal_gender.clone()),
            ("styleWeight", self.style_weight.to_string()),
            ("weirdnessConstraint", self.weirdness_constraint.to_string()),
            ("audioWeight", self.audio_weight.to_string()),
        ]
    }

    fn size_metric(&self) -> usize {
        self.song_prompt.chars().count()
    }
}

pub struct SongPipeline {
    retry_loop: RetryLoop<SongPrompt>,
    post: PostProcessor,
    history_path: PathBuf,
    profile: AgentProfile,
}

impl SongPipeline {
    /// Wire the LLM generator/validator from the router.
    pub fn new(
        router: &ModelRouter,
        profile: AgentProfile,
        history_path: impl Into<PathBuf>,
        max_attempts: usize,
        side_effect: Option<Arc<dyn MediaSideEffect>>,
    ) -> Result<Self, RouterError> {
        let generator = Arc::new(LlmArtifactGenerator::<SongPrompt>::new(
            router.thinking_or_main()?,
            prompts::SONG_GENERATION,
        ));
        let validator = Arc::new(LlmArtifactValidator::<SongPrompt>::new(
            router.validation_or_main()?,
            prompts::SONG_VALIDATION,
        ));
        Ok(Self::from_parts(
            generator,
            validator,
            profile,
            history_path,
            max_attempts,
            side_effect,
        ))
    }

    pub fn from_parts(
        generator: Arc<dyn ArtifactGenerator<SongPrompt>>,
        validator: Arc<dyn ArtifactValidator<SongPrompt>>,
        profile: AgentProfile,
        history_path: impl Into<PathBuf>,
        max_attempts: usize,
        side_effect: Option<Arc<dyn MediaSideEffect>>,
    ) -> Self {
        let mut post = PostProcessor::new(SONG_HISTORY_KEY);
        if let Some(side_effect) = side_effect {
            post = post.with_side_effect(side_effect);
        }
        Self {
            retry_loop: RetryLoop::new(generator, validator).with_max_attempts(max_attempts),
            post,
            history_path: history_path.into(),
            profile,
        }
    }

    /// Context for the next run: profile plus the most recent songs.
    pub fn build_context(&self) -> GenerationContext {
        let memory = HistoryStore::new(&self.history_path, SONG_HISTORY_KEY)
            .recent(MEMORY_LIMIT)
            .iter()
            .map(|record| record.to_value())
            .collect();

        GenerationContext::new(self.profile.name.clone())
            .with_memory(memory)
            .with_style(self.profile.music_style.clone())
            .with_personality(self.profile.personality.clone())
    }

    pub async fn run_once(&self) -> Result<RunOutcome> {
        let context = self.build_context();
        info!(agent = %self.profile.name, memory = context.memory().len(), "Starting song run");

        match self.retry_loop.run(context).await? {
            LoopOutcome::Accepted { candidate, attempts } => {
                info!(song = %candidate.song_name, attempts, "Song prompt accepted");
                let finished = self.post.finish(&candidate, &self.history_path).await?;
                Ok(RunOutcome::Completed {
                    record: finished.record,
                    media: finished.media,
                })
            }
            LoopOutcome::Exhausted { attempts, .. } => Ok(RunOutcome::Exhausted { attempts }),
        }
    }

    /// Run `count` songs one after another.
    pub async fn run_batch(&self, count: usize) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for index in 1..=count {
            info!(index, count, "Generating song");
            let result = self.run_once().await;
            if let Err(e) = &result {
                error!(index, error = %format!("{:#}", e), "Song run failed");
            }
            summary.record(&result);
        }
        info!(?summary, "Song batch finished");
        summary
    }
}
