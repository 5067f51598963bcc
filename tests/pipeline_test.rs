// Integration tests for the song and news pipelines with in-process doubles

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use refrain::errors::{MediaError, WorkflowError};
use refrain::history::HistoryStore;
use refrain::media::{MediaSideEffect, PublishedMedia};
use refrain::pipelines::news::NewsRun;
use refrain::pipelines::{AgentProfile, NewsArticle, NewsPipeline, RunOutcome, SongPipeline, SongPrompt};
use refrain::providers::{LlmProvider, RawResponse};
use refrain::research::{ResearchFanOut, ResearchSource, ResearchTopic};
use refrain::workflow::{Artifact, ArtifactGenerator, ArtifactValidator, GenerationContext, ValidationVerdict};

fn song() -> SongPrompt {
    serde_json::from_value(json!({
        "song_name": "Neon Rain",
        "song_prompt": "slow synthwave with rain",
        "negativeTags": "metal",
        "vocalGender": "f",
        "styleWeight": 0.6,
        "weirdnessConstraint": 0.3,
        "audioWeight": 0.5
    }))
    .unwrap()
}

/// Always returns the same candidate and keeps the contexts it saw.
struct FixedGenerator<A> {
    candidate: A,
    contexts: Mutex<Vec<GenerationContext>>,
}

impl<A> FixedGenerator<A> {
    fn new(candidate: A) -> Arc<Self> {
        Arc::new(Self {
            candidate,
            contexts: Mutex::new(Vec::new()),
        })
    }

    fn contexts(&self) -> Vec<GenerationContext> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl<A: Artifact> ArtifactGenerator<A> for FixedGenerator<A> {
    async fn generate(&self, context: &GenerationContext) -> Result<A, WorkflowError> {
        self.contexts.lock().unwrap().push(context.clone());
        Ok(self.candidate.clone())
    }
}

struct FixedVerdict(ValidationVerdict);

#[async_trait]
impl<A: Artifact> ArtifactValidator<A> for FixedVerdict {
    async fn validate(&self, _candidate: &A, _context: &GenerationContext) -> ValidationVerdict {
        self.0.clone()
    }
}

/// Rejects the first `rejections` calls, then accepts. Keeps what it judged.
struct RejectFirst {
    rejections: usize,
    seen: Mutex<Vec<(Value, usize)>>,
}

impl RejectFirst {
    fn new(rejections: usize) -> Arc<Self> {
        Arc::new(Self {
            rejections,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<(Value, usize)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl<A: Artifact> ArtifactValidator<A> for RejectFirst {
    async fn validate(&self, candidate: &A, _context: &GenerationContext) -> ValidationVerdict {
        let mut seen = self.seen.lock().unwrap();
        seen.push((serde_json::to_value(candidate).unwrap(), candidate.size_metric()));
        if seen.len() <= self.rejections {
            ValidationVerdict::rejected("try again")
        } else {
            ValidationVerdict::accepted()
        }
    }
}

/// Side effect that records what it was asked to publish.
struct RecordingMedia {
    fail: bool,
    seen: Mutex<Vec<Value>>,
}

impl RecordingMedia {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<Value> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaSideEffect for RecordingMedia {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish(&self, candidate: &Value) -> Result<PublishedMedia, MediaError> {
        self.seen.lock().unwrap().push(candidate.clone());
        if self.fail {
            return Err(MediaError::NoOutput { service: "recording" });
        }
        Ok(PublishedMedia {
            files: vec![PathBuf::from("out.mp3")],
            titles: vec!["out".into()],
        })
    }
}

fn song_pipeline(
    history: PathBuf,
    verdict: ValidationVerdict,
    media: Option<Arc<RecordingMedia>>,
) -> (SongPipeline, Arc<FixedGenerator<SongPrompt>>) {
    let generator = FixedGenerator::new(song());
    let pipeline = SongPipeline::from_parts(
        generator.clone(),
        Arc::new(FixedVerdict(verdict)),
        AgentProfile::default(),
        history,
        3,
        media.map(|m| m as Arc<dyn MediaSideEffect>),
    );
    (pipeline, generator)
}

#[tokio::test]
async fn test_accepted_song_is_recorded_then_published() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let history = dir.path().join("music_memory.json");
    let media = RecordingMedia::new(false);
    let (pipeline, _) = song_pipeline(history.clone(), ValidationVerdict::accepted(), Some(media.clone()));

    let outcome = pipeline.run_once().await?;

    assert!(outcome.is_success());
    let records = HistoryStore::new(&history, "music_generation_history").read();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].field_str("song_name"), Some("Neon Rain"));
    assert_eq!(media.seen()[0]["negativeTags"], "metal");
    Ok(())
}

#[tokio::test]
async fn test_exhausted_song_writes_nothing_and_skips_media() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let history = dir.path().join("music_memory.json");
    let media = RecordingMedia::new(false);
    let (pipeline, generator) =
        song_pipeline(history.clone(), ValidationVerdict::rejected("boring"), Some(media.clone()));

    let outcome = pipeline.run_once().await?;

    assert!(matches!(outcome, RunOutcome::Exhausted { attempts: 3 }));
    assert!(!history.exists());
    assert!(media.seen().is_empty());
    assert_eq!(generator.contexts().len(), 3);
    assert_eq!(generator.contexts()[2].feedback(), Some("boring"));
    Ok(())
}

#[tokio::test]
async fn test_publish_failure_keeps_history_record() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let history = dir.path().join("music_memory.json");
    let (pipeline, _) =
        song_pipeline(history.clone(), ValidationVerdict::accepted(), Some(RecordingMedia::new(true)));

    let outcome = pipeline.run_once().await?;

    match outcome {
        RunOutcome::Completed { record, media } => {
            assert_eq!(record.id, 1);
            assert!(matches!(media, Err(MediaError::NoOutput { .. })));
        }
        other => panic!("expected a completed run, got {:?}", other),
    }
    assert_eq!(HistoryStore::new(&history, "music_generation_history").read().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_batch_continues_after_exhausted_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let history = dir.path().join("music_memory.json");
    let generator = FixedGenerator::new(song());
    let pipeline = SongPipeline::from_parts(
        generator.clone(),
        RejectFirst::new(3),
        AgentProfile::default(),
        history.clone(),
        3,
        None,
    );

    let summary = pipeline.run_batch(2).await;

    assert_eq!(summary.exhausted, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.total(), 2);
    assert!(!summary.all_succeeded());
    let contexts = generator.contexts();
    assert_eq!(contexts.len(), 4);
    assert_eq!(contexts[3].feedback(), None);
    assert!(contexts[3].memory().is_empty());
    let records = HistoryStore::new(&history, "music_generation_history").read();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 1);
    Ok(())
}

#[tokio::test]
async fn test_batch_feeds_memory_forward() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let history = dir.path().join("music_memory.json");
    let (pipeline, generator) = song_pipeline(history.clone(), ValidationVerdict::accepted(), None);

    let summary = pipeline.run_batch(3).await;

    assert_eq!(summary.completed, 3);
    assert!(summary.all_succeeded());
    let memory_sizes: Vec<usize> = generator.contexts().iter().map(|c| c.memory().len()).collect();
    assert_eq!(memory_sizes, vec![0, 1, 2]);
    let ids: Vec<u64> = HistoryStore::new(&history, "music_generation_history")
        .read()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    Ok(())
}

/// Research model answering query and summary prompts by their shape.
struct DeskModel {
    fail_queries: bool,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LlmProvider for DeskModel {
    async fn invoke(&self, prompt: &str) -> Result<RawResponse> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let text = if prompt.contains("executive_summary") {
            r#"{"title": "Update", "executive_summary": "Prices moved."}"#.to_string()
        } else if self.fail_queries {
            anyhow::bail!("rate limited");
        } else {
            r#"{"query": "latest defi news", "research_topic": "DeFi"}"#.to_string()
        };
        Ok(RawResponse::new(text, "desk", "test"))
    }

    fn name(&self) -> &str {
        "desk"
    }

    fn model(&self) -> &str {
        "test"
    }
}

struct Feed {
    name: &'static str,
    fail: bool,
    queries: Mutex<VecDeque<String>>,
    topics: Mutex<Vec<ResearchTopic>>,
}

impl Feed {
    fn new(name: &'static str, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail,
            queries: Mutex::new(VecDeque::new()),
            topics: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ResearchSource for Feed {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, query: &str, topic: &ResearchTopic) -> Result<String> {
        self.queries.lock().unwrap().push_back(query.to_string());
        self.topics.lock().unwrap().push(topic.clone());
        if self.fail {
            anyhow::bail!("timeout");
        }
        Ok(format!("{} results", self.name))
    }
}

fn news_run(history: PathBuf) -> NewsRun {
    NewsRun {
        topic: "Web3".into(),
        subtopics: vec!["Bitcoin".into(), "DeFi".into()],
        show_name: "Night Desk".into(),
        profile: AgentProfile::default(),
        history_path: history,
        max_attempts: 3,
    }
}

fn article() -> NewsArticle {
    NewsArticle {
        title: "**Markets** tonight".into(),
        content: "## Top story\n\n- Bitcoin climbs".into(),
    }
}

#[tokio::test]
async fn test_news_report_collects_every_subtopic() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let feed = Feed::new("web", false);
    let broken = Feed::new("social", true);
    let model = Arc::new(DeskModel {
        fail_queries: false,
        prompts: Mutex::new(Vec::new()),
    });
    let pipeline = NewsPipeline::from_parts(
        news_run(dir.path().join("news.json")),
        model.clone(),
        ResearchFanOut::new(vec![feed.clone() as Arc<dyn ResearchSource>, broken]),
        FixedGenerator::new(article()),
        Arc::new(FixedVerdict(ValidationVerdict::accepted())),
        None,
    );

    let report = pipeline.build_report().await;

    assert!(report.contains("------Bitcoin------\n\nPrices moved."));
    assert!(report.contains("------DeFi------"));
    assert_eq!(feed.queries.lock().unwrap().front().map(String::as_str), Some("latest defi news"));
    let summary_prompt = model
        .prompts
        .lock()
        .unwrap()
        .iter()
        .find(|p| p.contains("executive_summary"))
        .cloned()
        .unwrap();
    assert!(summary_prompt.contains("Source: web\n\nweb results"));
    assert!(summary_prompt.contains("Note: The search for 'social' failed."));
    Ok(())
}

#[tokio::test]
async fn test_query_failure_searches_subtopic_name() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let feed = Feed::new("web", false);
    let model = Arc::new(DeskModel {
        fail_queries: true,
        prompts: Mutex::new(Vec::new()),
    });
    let pipeline = NewsPipeline::from_parts(
        news_run(dir.path().join("news.json")),
        model,
        ResearchFanOut::new(vec![feed.clone() as Arc<dyn ResearchSource>]),
        FixedGenerator::new(article()),
        Arc::new(FixedVerdict(ValidationVerdict::accepted())),
        None,
    );

    pipeline.build_report().await;

    let queries: Vec<String> = feed.queries.lock().unwrap().iter().cloned().collect();
    assert_eq!(queries, vec!["Bitcoin".to_string(), "DeFi".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_news_run_cleans_records_and_voices_article() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let history = dir.path().join("news_memory_Web3.json");
    HistoryStore::new(&history, "news_history").append(
        json!({"title": "Yesterday", "content": "old"})
            .as_object()
            .cloned()
            .unwrap_or_default(),
    )?;
    let generator = FixedGenerator::new(article());
    let voice = RecordingMedia::new(false);
    let pipeline = NewsPipeline::from_parts(
        news_run(history.clone()),
        Arc::new(DeskModel {
            fail_queries: false,
            prompts: Mutex::new(Vec::new()),
        }),
        ResearchFanOut::new(Vec::new()),
        generator.clone(),
        Arc::new(FixedVerdict(ValidationVerdict::accepted())),
        Some(voice.clone() as Arc<dyn MediaSideEffect>),
    );

    let outcome = pipeline.run_once().await?;

    assert!(outcome.is_success());
    let context = &generator.contexts()[0];
    assert_eq!(context.memory(), &[json!("Yesterday")]);
    assert_eq!(context.extra("topics"), Some("Bitcoin, DeFi"));
    assert_eq!(context.extra("show_name"), Some("Night Desk"));
    assert!(context.extra("research_report").unwrap().contains("------DeFi------"));

    let records = HistoryStore::new(&history, "news_history").read();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].id, 2);
    assert_eq!(records[1].field_str("title"), Some("Markets tonight"));
    assert_eq!(voice.seen()[0]["content"], "Top story\n\nBitcoin climbs");
    Ok(())
}

#[tokio::test]
async fn test_subtopic_sources_reach_research_feeds() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let feed = Feed::new("social", false);
    let mut run = news_run(dir.path().join("news.json"));
    run.subtopics = vec![ResearchTopic {
        name: "DeFi".into(),
        twitter_sources: vec!["@defillama".into()],
        telegram_sources: vec!["defi_daily".into()],
    }];
    let pipeline = NewsPipeline::from_parts(
        run,
        Arc::new(DeskModel {
            fail_queries: false,
            prompts: Mutex::new(Vec::new()),
        }),
        ResearchFanOut::new(vec![feed.clone() as Arc<dyn ResearchSource>]),
        FixedGenerator::new(article()),
        Arc::new(FixedVerdict(ValidationVerdict::accepted())),
        None,
    );

    pipeline.build_report().await;

    let topics = feed.topics.lock().unwrap().clone();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].name, "DeFi");
    assert_eq!(topics[0].twitter_sources, vec!["@defillama"]);
    assert_eq!(topics[0].telegram_sources, vec!["defi_daily"]);
    Ok(())
}

#[tokio::test]
async fn test_validator_judges_the_text_that_is_stored_and_voiced() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let history = dir.path().join("news_memory_Web3.json");
    let validator = RejectFirst::new(0);
    let voice = RecordingMedia::new(false);
    let pipeline = NewsPipeline::from_parts(
        news_run(history.clone()),
        Arc::new(DeskModel {
            fail_queries: false,
            prompts: Mutex::new(Vec::new()),
        }),
        ResearchFanOut::new(Vec::new()),
        FixedGenerator::new(NewsArticle {
            title: "Robots".into(),
            content: "## Intro\n\n**Robots** are *here*.".into(),
        }),
        validator.clone(),
        Some(voice.clone() as Arc<dyn MediaSideEffect>),
    );

    assert!(pipeline.run_once().await?.is_success());

    let (judged, size) = validator.seen()[0].clone();
    assert_eq!(judged["content"], "Intro\n\nRobots are here.");
    assert_eq!(size, "Intro\n\nRobots are here.".chars().count());
    let records = HistoryStore::new(&history, "news_history").read();
    assert_eq!(records[0].field_str("content"), judged["content"].as_str());
    assert_eq!(voice.seen()[0]["content"], judged["content"]);
    Ok(())
}

#[tokio::test]
async fn test_markdown_only_draft_counts_as_malformed() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let validator = RejectFirst::new(0);
    let pipeline = NewsPipeline::from_parts(
        news_run(dir.path().join("news.json")),
        Arc::new(DeskModel {
            fail_queries: false,
            prompts: Mutex::new(Vec::new()),
        }),
        ResearchFanOut::new(Vec::new()),
        FixedGenerator::new(NewsArticle {
            title: "Tonight".into(),
            content: "***".into(),
        }),
        validator.clone(),
        None,
    );

    let outcome = pipeline.run_once().await?;

    assert!(matches!(outcome, RunOutcome::Exhausted { attempts: 3 }));
    assert!(validator.seen().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rejected_article_is_handed_back_for_revision() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let generator = FixedGenerator::new(article());
    let pipeline = NewsPipeline::from_parts(
        news_run(dir.path().join("news.json")),
        Arc::new(DeskModel {
            fail_queries: false,
            prompts: Mutex::new(Vec::new()),
        }),
        ResearchFanOut::new(Vec::new()),
        generator.clone(),
        RejectFirst::new(1),
        None,
    );

    assert!(pipeline.run_once().await?.is_success());

    let contexts = generator.contexts();
    assert_eq!(contexts.len(), 2);
    assert!(contexts[0].previous_draft().is_none());
    let draft = contexts[1].previous_draft().unwrap();
    assert_eq!(draft.text, "Top story\n\nBitcoin climbs");
    assert_eq!(draft.size, 25);
    assert_eq!(contexts[1].feedback(), Some("try again"));
    Ok(())
}
