// Subcommand handlers
//
// Startup failures (config, personality, model resolution) are returned as
// errors. Run failures are logged and reported through `CommandStatus`.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{Config, ModelRole};
use crate::media::{MediaSideEffect, SunoPublisher, VoiceSynthesizer};
use crate::pipelines::news::{load_topics, news_history_path, NewsRun};
use crate::pipelines::{AgentProfile, NewsPipeline, RunOutcome, SongPipeline};
use crate::research::{HttpFeedSource, ResearchFanOut, ResearchSource};
use crate::router::ModelRouter;

/// Whether a command did everything it was asked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failure,
}

impl CommandStatus {
    pub fn from_success(ok: bool) -> Self {
        if ok {
            Self::Success
        } else {
            Self::Failure
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// `refrain check`: resolve every role and print what it maps to.
///
/// Fails only when `main` cannot be resolved; the other roles are optional.
pub fn run_check(config: &Config) -> CommandStatus {
    let router = ModelRouter::new(config.llm.clone());
    let mut main_ok = false;

    for (role, result) in router.check_all() {
        match result {
            Ok(description) => {
                println!("✓ {:<10} {}", role.to_string(), description);
                if role == ModelRole::Main {
                    main_ok = true;
                }
            }
            Err(e) => println!("✗ {:<10} {}", role.to_string(), e),
        }
    }

    CommandStatus::from_success(main_ok)
}

/// `refrain song --count N`
pub async fn run_songs(config: &Config, count: usize) -> Result<CommandStatus> {
    let profile = AgentProfile::load_or_default(config.agent_personality_path.as_deref())?;
    let router = ModelRouter::new(config.llm.clone());

    let suno: Option<Arc<dyn MediaSideEffect>> =
        match SunoPublisher::new(config.song.suno.clone(), &config.song.output_dir) {
            Ok(publisher) => Some(Arc::new(publisher)),
            Err(e) => {
                warn!(error = %e, "Suno is not configured; accepted songs will only be recorded");
                None
            }
        };

    let pipeline = SongPipeline::new(
        &router,
        profile,
        &config.song.memory_path,
        config.max_attempts,
        suno,
    )
    .context("Failed to resolve models for the song pipeline")?;

    let summary = pipeline.run_batch(count).await;
    println!(
        "Songs: {} completed, {} publish failed, {} exhausted, {} failed",
        summary.completed, summary.publish_failed, summary.exhausted, summary.failed
    );
    Ok(CommandStatus::from_success(summary.all_succeeded()))
}

/// `refrain news <topic>`
pub async fn run_news(config: &Config, topic: &str) -> Result<CommandStatus> {
    let profile = AgentProfile::load_or_default(config.agent_personality_path.as_deref())?;
    let subtopics = load_topics(&config.news.topics_dir, topic)?;
    info!(topic, subtopics = subtopics.len(), "Loaded news topics");

    let sources = config
        .news
        .feeds
        .iter()
        .map(|spec| {
            HttpFeedSource::from_spec(spec).map(|source| Arc::new(source) as Arc<dyn ResearchSource>)
        })
        .collect::<Result<Vec<_>>>()?;
    if sources.is_empty() {
        warn!("No research feeds configured; articles will be written without research");
    }

    let voice: Option<Arc<dyn MediaSideEffect>> =
        match VoiceSynthesizer::new(config.news.voice.clone(), &config.news.voice_output_dir) {
            Ok(synth) => Some(Arc::new(synth.with_file_prefix(topic))),
            Err(e) => {
                warn!(error = %e, "ElevenLabs is not configured; accepted articles will only be recorded");
                None
            }
        };

    let router = ModelRouter::new(config.llm.clone());
    let run = NewsRun {
        topic: topic.to_string(),
        subtopics,
        show_name: config.news.show_name.clone(),
        profile,
        history_path: news_history_path(&config.news.output_dir, topic),
        max_attempts: config.max_attempts,
    };
    let pipeline = NewsPipeline::new(&router, run, ResearchFanOut::new(sources), voice)
        .context("Failed to resolve models for the news pipeline")?;

    let outcome = match pipeline.run_once().await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(topic, error = %format!("{:#}", e), "News run failed");
            return Ok(CommandStatus::Failure);
        }
    };

    match &outcome {
        RunOutcome::Completed { record, media } => {
            println!(
                "Article #{} \"{}\" saved",
                record.id,
                record.field_str("title").unwrap_or_default()
            );
            match media {
                Ok(published) => {
                    for file in &published.files {
                        println!("  audio: {}", file.display());
                    }
                }
                Err(e) => println!("  voice synthesis failed: {}", e),
            }
        }
        RunOutcome::Exhausted { attempts } => {
            println!("No article passed validation after {} attempts", attempts)
        }
    }

    Ok(CommandStatus::from_success(outcome.is_success()))
}
