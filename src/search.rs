//! Web search tool
//!
//! Queries the `DuckDuckGo` HTML endpoint and hands the top results back to
//! the model as a numbered list.

use crate::models::ToolArguments;
use crate::tools::{FunctionDeclaration, Tool, ToolKind, required_argument};
use crate::{AgentError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Reply when the provider returned nothing
pub const NO_RESULTS: &str = "No search results found.";

/// A single search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Title of the result
    pub title: String,
    /// Snippet text of the result
    pub body: String,
}

impl SearchHit {
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// A text search provider
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Up to `max_results` hits in provider ranking order
    async fn text(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

static RESULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div[^>]*class="(result(?:\s[^"]*)?)""#).expect("result pattern")
});
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*>(.*?)</a>"#).expect("title pattern")
});
static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</(?:a|div|td)>"#).expect("snippet pattern")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("space pattern"));

/// `DuckDuckGo` search through its JavaScript-free HTML interface
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoSearch {
    /// Create a search client against `base_url` (e.g. `https://html.duckduckgo.com`)
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Extract result titles and snippets from a results page
    ///
    /// Each `<div class="result ...">` block yields at most one hit; the
    /// snippet is taken from the same block as its title. Ads are skipped.
    #[must_use]
    pub fn parse_results(html: &str) -> Vec<SearchHit> {
        let starts: Vec<_> = RESULT_RE.captures_iter(html).collect();

        starts
            .iter()
            .enumerate()
            .filter(|(_, start)| !start[1].split_whitespace().any(|class| class == "result--ad"))
            .filter_map(|(i, start)| {
                let begin = start.get(0).map_or(0, |m| m.start());
                let end = starts
                    .get(i + 1)
                    .and_then(|next| next.get(0))
                    .map_or(html.len(), |m| m.start());
                let block = &html[begin..end];

                let title = TITLE_RE.captures(block).map(|c| clean_text(&c[1]))?;
                if title.is_empty() {
                    return None;
                }
                let body = SNIPPET_RE
                    .captures(block)
                    .map(|c| clean_text(&c[1]))
                    .unwrap_or_default();
                Some(SearchHit { title, body })
            })
            .collect()
    }

    /// Whether a page without results is the bot-check served when rate limited
    fn is_challenge_page(html: &str) -> bool {
        html.contains("challenge-form") || html.contains("anomaly-modal")
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    #[instrument(skip(self))]
    async fn text(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let start_time = Instant::now();
        let url = format!("{}/html/?q={}", self.base_url, urlencoding::encode(query));
        debug!("DuckDuckGo request URL: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        // DuckDuckGo answers 202 with a bot-check page when rate limiting.
        if status != reqwest::StatusCode::OK {
            return Err(AgentError::api(format!(
                "Search request failed with status {status}"
            )));
        }

        let html = response.text().await?;
        let mut hits = Self::parse_results(&html);
        if hits.is_empty() && Self::is_challenge_page(&html) {
            return Err(AgentError::api("Search provider rate limited the request"));
        }
        hits.truncate(max_results);

        info!(
            "Found {} search results in {:.3}s",
            hits.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(hits)
    }
}

/// Strip markup, decode the usual entities and collapse whitespace
fn clean_text(fragment: &str) -> String {
    let text = TAG_RE.replace_all(fragment, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    SPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Render hits as a 1-based numbered list, one line each
#[must_use]
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_RESULTS.to_string();
    }

    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("{}. {}: {}", i + 1, hit.title, hit.body))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The `search_web` tool
pub struct SearchTool {
    provider: Arc<dyn SearchProvider>,
    max_results: usize,
}

impl SearchTool {
    #[must_use]
    pub fn new(provider: Arc<dyn SearchProvider>, max_results: usize) -> Self {
        Self {
            provider,
            max_results,
        }
    }

    /// Search results for `query`; failures are rendered into the text
    pub async fn search_web(&self, query: &str) -> String {
        info!("Searching web for: {}", query);
        match self.provider.text(query, self.max_results).await {
            Ok(mut hits) => {
                hits.truncate(self.max_results);
                format_hits(&hits)
            }
            Err(e) => {
                warn!("Web search for '{}' failed: {}", query, e);
                format!("Error searching web: {e}")
            }
        }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Search
    }

    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration::single_string(
            ToolKind::Search,
            "Searches the web for the given query to find real-time information.",
            "The search query",
        )
    }

    async fn call(&self, arguments: &ToolArguments) -> Result<String> {
        let query = required_argument(ToolKind::Search, arguments)?;
        Ok(self.search_web(query).await)
    }
}
