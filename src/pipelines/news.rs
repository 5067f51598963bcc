// News pipeline
//
// For each subtopic: write a search query, fan out research, summarize.
// The joined summaries feed RetryLoop<NewsArticle>. Drafts are cleaned for
// speech as they are generated, so the validator, the history and the voice
// all see the same text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{prompts, AgentProfile, RunOutcome};
use crate::config::constants::{MEMORY_LIMIT, NEWS_HISTORY_KEY};
use crate::config::ModelRole;
use crate::errors::{RouterError, WorkflowError};
use crate::history::HistoryStore;
use crate::media::MediaSideEffect;
use crate::postprocess::PostProcessor;
use crate::research::{ResearchFanOut, ResearchTopic};
use crate::router::{ModelHandle, ModelRouter};
use crate::workflow::{
    parse_json_object, render, Artifact, ArtifactGenerator, ArtifactValidator, GenerationContext,
    LlmArtifactGenerator, LlmArtifactValidator, LoopOutcome, RetryLoop,
};

const NO_SUMMARY: &str = "No summary available.";

/// A radio news segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub content: String,
}

impl NewsArticle {
    /// Same article with markdown and stray whitespace removed.
    pub fn cleaned_for_voice(&self) -> Self {
        Self {
            title: clean_for_voice(&self.title),
            content: clean_for_voice(&self.content),
        }
    }
}

impl Artifact for NewsArticle {
    const KIND: &'static str = "article";
    const REQUIRED_FIELDS: &'static [&'static str] = &["title", "content"];

    fn check(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is empty".into());
        }
        if self.content.trim().is_empty() {
            return Err("content is empty".into());
        }
        Ok(())
    }

    fn template_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("title", self.title.clone()),
            ("content", self.content.clone()),
        ]
    }

    fn size_metric(&self) -> usize {
        self.content.chars().count()
    }

    fn revision_text(&self) -> String {
        self.content.clone()
    }
}

/// Cleans every draft for speech before it reaches the validator.
pub struct SpokenArticleGenerator {
    inner: Arc<dyn ArtifactGenerator<NewsArticle>>,
}

impl SpokenArticleGenerator {
    pub fn new(inner: Arc<dyn ArtifactGenerator<NewsArticle>>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ArtifactGenerator<NewsArticle> for SpokenArticleGenerator {
    async fn generate(&self, context: &GenerationContext) -> Result<NewsArticle, WorkflowError> {
        let article = self.inner.generate(context).await?.cleaned_for_voice();
        // Markdown-only fields are empty once cleaned
        article
            .check()
            .map_err(|detail| WorkflowError::malformed(NewsArticle::KIND, detail))?;
        Ok(article)
    }
}

static MD_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("valid regex"));
static MD_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]*").expect("valid regex"));
static MD_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:[-*•]|\d{1,2}\.)[ \t]+").expect("valid regex"));
static MD_EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*{1,3}|_{2,3}|`+").expect("valid regex"));
static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n(\s*\n)+").expect("valid regex"));

/// Strip markdown so text-to-speech reads only words.
pub fn clean_for_voice(text: &str) -> String {
    let text = MD_LINK.replace_all(text, "$1");
    let text = MD_HEADING.replace_all(&text, "");
    let text = MD_BULLET.replace_all(&text, "");
    let text = MD_EMPHASIS.replace_all(&text, "");
    let text = INLINE_SPACE.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Subtopics listed in `<topic>_topics.json`, in key order.
///
/// `{"topics": {"DeFi": {"twitter_sources": [..], "telegram_sources": [..]}}}`
pub fn load_topics(topics_dir: &Path, topic: &str) -> Result<Vec<ResearchTopic>> {
    let path = topics_dir.join(format!("{}_topics.json", topic));
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read topics file {}", path.display()))?;

    #[derive(Deserialize)]
    struct TopicsFile {
        topics: BTreeMap<String, Option<ResearchTopic>>,
    }

    let file: TopicsFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse topics file {}", path.display()))?;
    if file.topics.is_empty() {
        anyhow::bail!("Topics file {} lists no topics", path.display());
    }
    Ok(file
        .topics
        .into_iter()
        .map(|(name, entry)| ResearchTopic {
            name,
            ..entry.unwrap_or_default()
        })
        .collect())
}

/// `<output_dir>/news_memory_<topic>.json`
pub fn news_history_path(output_dir: &Path, topic: &str) -> PathBuf {
    output_dir.join(format!("news_memory_{}.json", topic))
}

#[derive(Debug, Deserialize)]
struct SearchPlan {
    query: String,
}

pub struct NewsPipeline {
    topic: String,
    subtopics: Vec<ResearchTopic>,
    show_name: String,
    /// Query writing and summarization
    research_model: ModelHandle,
    research: ResearchFanOut,
    retry_loop: RetryLoop<NewsArticle>,
    post: PostProcessor,
    history_path: PathBuf,
    profile: AgentProfile,
}

/// Inputs shared by [`NewsPipeline::new`] and [`NewsPipeline::from_parts`].
pub struct NewsRun {
    pub topic: String,
    pub subtopics: Vec<ResearchTopic>,
    pub show_name: String,
    pub profile: AgentProfile,
    pub history_path: PathBuf,
    pub max_attempts: usize,
}

impl NewsPipeline {
    pub fn new(
        router: &ModelRouter,
        run: NewsRun,
        research: ResearchFanOut,
        side_effect: Option<Arc<dyn MediaSideEffect>>,
    ) -> Result<Self, RouterError> {
        let research_model = router.resolve(ModelRole::Main)?;
        let generator = Arc::new(LlmArtifactGenerator::<NewsArticle>::new(
            router.thinking_or_main()?,
            prompts::NEWS_ARTICLE,
        ));
        let validator = Arc::new(LlmArtifactValidator::<NewsArticle>::new(
            router.validation_or_main()?,
            prompts::NEWS_VALIDATION,
        ));
        Ok(Self::from_parts(
            run,
            research_model,
            research,
            generator,
            validator,
            side_effect,
        ))
    }

    pub fn from_parts(
        run: NewsRun,
        research_model: ModelHandle,
        research: ResearchFanOut,
        generator: Arc<dyn ArtifactGenerator<NewsArticle>>,
        validator: Arc<dyn ArtifactValidator<NewsArticle>>,
        side_effect: Option<Arc<dyn MediaSideEffect>>,
    ) -> Self {
        let generator: Arc<dyn ArtifactGenerator<NewsArticle>> =
            Arc::new(SpokenArticleGenerator::new(generator));
        let mut post = PostProcessor::new(NEWS_HISTORY_KEY);
        if let Some(side_effect) = side_effect {
            post = post.with_side_effect(side_effect);
        }
        Self {
            topic: run.topic,
            subtopics: run.subtopics,
            show_name: run.show_name,
            research_model,
            research,
            retry_loop: RetryLoop::new(generator, validator).with_max_attempts(run.max_attempts),
            post,
            history_path: run.history_path,
            profile: run.profile,
        }
    }

    /// Titles of the most recent articles for this topic.
    pub fn memory_titles(&self) -> Vec<Value> {
        HistoryStore::new(&self.history_path, NEWS_HISTORY_KEY)
            .recent(MEMORY_LIMIT)
            .iter()
            .filter_map(|record| record.field_str("title"))
            .map(|title| Value::String(title.to_string()))
            .collect()
    }

    /// Research every subtopic in order and join the summaries.
    pub async fn build_report(&self) -> String {
        let mut report = String::new();
        for subtopic in &self.subtopics {
            let name = subtopic.name.as_str();
            info!(
                topic = %self.topic,
                subtopic = name,
                twitter_sources = subtopic.twitter_sources.len(),
                telegram_sources = subtopic.telegram_sources.len(),
                "Researching subtopic"
            );
            let query = self.write_query(name).await;
            let findings = self.research.research(&query, subtopic).await;
            let summary = self.summarize(name, &findings).await;
            report.push_str(&format!("------{}------\n\n{}\n\n------\n\n", name, summary));
        }
        report
    }

    /// Ask the model for a search query. Falls back to the subtopic itself.
    async fn write_query(&self, subtopic: &str) -> String {
        let vars = BTreeMap::from([
            ("current_date".to_string(), today()),
            ("current_topic".to_string(), subtopic.to_string()),
        ]);
        let prompt = render(prompts::NEWS_QUERY, &vars);

        let result = async {
            let response = self.research_model.invoke(&prompt).await?;
            let map = parse_json_object(&response.text).map_err(anyhow::Error::msg)?;
            let plan: SearchPlan = serde_json::from_value(Value::Object(map))?;
            anyhow::Ok(plan.query)
        }
        .await;

        match result {
            Ok(query) if !query.trim().is_empty() => {
                debug!(subtopic, query = %query, "Search query written");
                query
            }
            Ok(_) => subtopic.to_string(),
            Err(e) => {
                warn!(subtopic, error = %e, "Could not write a search query; searching the subtopic name");
                subtopic.to_string()
            }
        }
    }

    async fn summarize(&self, subtopic: &str, findings: &str) -> String {
        let vars = BTreeMap::from([
            ("current_topic".to_string(), subtopic.to_string()),
            ("research_results".to_string(), findings.to_string()),
        ]);
        let prompt = render(prompts::NEWS_SUMMARY, &vars);

        let result = async {
            let response = self.research_model.invoke(&prompt).await?;
            parse_json_object(&response.text).map_err(anyhow::Error::msg)
        }
        .await;

        match result {
            Ok(map) => map
                .get("executive_summary")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(NO_SUMMARY)
                .to_string(),
            Err(e) => {
                warn!(subtopic, error = %e, "Summarization failed");
                NO_SUMMARY.to_string()
            }
        }
    }

    fn topic_names(&self) -> Vec<&str> {
        self.subtopics.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn build_context(&self, report: &str) -> GenerationContext {
        GenerationContext::new(self.profile.name.clone())
            .with_memory(self.memory_titles())
            .with_personality(self.profile.personality.clone())
            .with_extra("research_report", report)
            .with_extra("topics", self.topic_names().join(", "))
            .with_extra("show_name", self.show_name.clone())
            .with_extra("current_date", today())
            .with_extra("current_time", Local::now().format("%H:%M").to_string())
    }

    pub async fn run_once(&self) -> Result<RunOutcome> {
        info!(topic = %self.topic, subtopics = self.subtopics.len(), "Starting news run");
        let report = self.build_report().await;
        let context = self.build_context(&report);

        match self.retry_loop.run(context).await? {
            LoopOutcome::Accepted {
                candidate: article,
                attempts,
            } => {
                info!(title = %article.title, attempts, "News article accepted");
                let finished = self.post.finish(&article, &self.history_path).await?;
                Ok(RunOutcome::Completed {
                    record: finished.record,
                    media: finished.media,
                })
            }
            LoopOutcome::Exhausted { attempts, .. } => Ok(RunOutcome::Exhausted { attempts }),
        }
    }
}

fn today() -> String {
    Local::now().format("%B %d, %Y").to_string()
}
