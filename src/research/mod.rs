// Concurrent research fan-out
//
// Every source is queried at once. Sources run independently: a failure
// becomes a placeholder note and never cancels or fails its siblings.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// A subtopic to research, with the social accounts configured for it.
///
/// Deserialized from one entry of a topics file; the name is the entry's key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResearchTopic {
    #[serde(skip)]
    pub name: String,
    #[serde(default, alias = "twitter")]
    pub twitter_sources: Vec<String>,
    #[serde(default, alias = "telegram")]
    pub telegram_sources: Vec<String>,
}

impl ResearchTopic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl From<&str> for ResearchTopic {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One external lookup service.
#[async_trait]
pub trait ResearchSource: Send + Sync {
    fn name(&self) -> &str;

    /// Raw findings for `query` within `topic`.
    async fn fetch(&self, query: &str, topic: &ResearchTopic) -> Result<String>;
}

/// Per-source result.
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    Found { source: String, content: String },
    Failed { source: String },
}

impl Finding {
    pub fn source(&self) -> &str {
        match self {
            Self::Found { source, .. } | Self::Failed { source } => source,
        }
    }

    /// Text contributed to the research report.
    pub fn render(&self) -> String {
        match self {
            Self::Found { source, content } => format!("Source: {}\n\n{}", source, content),
            Self::Failed { source } => format!("Note: The search for '{}' failed.", source),
        }
    }
}

pub struct ResearchFanOut {
    sources: Vec<Arc<dyn ResearchSource>>,
}

impl ResearchFanOut {
    pub fn new(sources: Vec<Arc<dyn ResearchSource>>) -> Self {
        Self { sources }
    }

    /// Query all sources concurrently.
    ///
    /// Findings keep source order. Failures become [`Finding::Failed`];
    /// sources returning only whitespace are dropped.
    pub async fn gather(&self, query: &str, topic: &ResearchTopic) -> Vec<Finding> {
        let futures = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            async move {
                let name = source.name().to_string();
                let subtopic = topic.name.as_str();
                match source.fetch(query, topic).await {
                    Ok(content) if content.trim().is_empty() => {
                        warn!(source = %name, topic = subtopic, "Research source returned empty content");
                        None
                    }
                    Ok(content) => {
                        debug!(source = %name, topic = subtopic, bytes = content.len(), "Research source succeeded");
                        Some(Finding::Found {
                            source: name,
                            content: content.trim().to_string(),
                        })
                    }
                    Err(e) => {
                        warn!(source = %name, topic = subtopic, error = %e, "Research source failed");
                        Some(Finding::Failed { source: name })
                    }
                }
            }
        });

        let findings: Vec<Finding> = join_all(futures).await.into_iter().flatten().collect();
        let failed = findings.iter().filter(|f| matches!(f, Finding::Failed { .. })).count();
        info!(
            topic = %topic.name,
            sources = self.sources.len(),
            failed,
            "Research fan-out finished"
        );
        findings
    }

    /// Gather and join into a single report block.
    pub async fn research(&self, query: &str, topic: &ResearchTopic) -> String {
        compile(&self.gather(query, topic).await)
    }
}

pub fn compile(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(Finding::render)
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// JSON-over-HTTP search feed: `GET <url>?query=..&topic=..`.
///
/// Configured source lists go along as comma-separated `twitter_sources` and
/// `telegram_sources` parameters.
pub struct HttpFeedSource {
    name: String,
    url: String,
    client: Client,
}

impl HttpFeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            name: name.into(),
            url: url.into(),
            client,
        })
    }

    /// Parse a `name=url` feed entry.
    pub fn from_spec(spec: &str) -> Result<Self> {
        let (name, url) = spec
            .split_once('=')
            .map(|(n, u)| (n.trim(), u.trim()))
            .filter(|(n, u)| !n.is_empty() && !u.is_empty())
            .with_context(|| format!("Invalid research feed '{}': expected name=url", spec))?;
        Self::new(name, url)
    }
}

#[async_trait]
impl ResearchSource for HttpFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, query: &str, topic: &ResearchTopic) -> Result<String> {
        let mut params = vec![("query", query.to_string()), ("topic", topic.name.clone())];
        if !topic.twitter_sources.is_empty() {
            params.push(("twitter_sources", topic.twitter_sources.join(",")));
        }
        if !topic.telegram_sources.is_empty() {
            params.push(("telegram_sources", topic.telegram_sources.join(",")));
        }

        let response = self
            .client
            .get(&self.url)
            .query(&params)
            .send()
            .await
            .with_context(|| format!("Failed to query research feed {}", self.name))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {}", self.name))?;

        if !status.is_success() {
            anyhow::bail!("{} returned {}: {}", self.name, status, body);
        }

        // Pretty-print JSON bodies so the summarizer sees readable structure
        Ok(match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(body),
            Err(_) => body,
        })
    }
}
