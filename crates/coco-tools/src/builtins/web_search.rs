//! Web search tool - DuckDuckGo HTML endpoint, no API key required

use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use regex::Regex;
use reqwest::header::{CONTENT_TYPE, REFERER, USER_AGENT};
use reqwest::StatusCode;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Maximum number of search results to return
const MAX_RESULTS_CAP: usize = 10;

/// Default number of results
const DEFAULT_MAX_RESULTS: usize = 5;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

const BROWSER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a[^>]+class="result__a"[^>]+href="([^"]*)"[^>]*>(.*?)</a>"#)
        .expect("title regex")
});

static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a[^>]+class="result__snippet"[^>]*>(.*?)</a>"#).expect("snippet regex")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag regex"));

/// A single search result entry
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SearchResult {
    /// Page title
    pub title: String,
    /// Destination URL
    pub url: String,
    /// Result snippet
    pub snippet: String,
}

/// DuckDuckGo web search
///
/// The model passes only a query; the request is built here.
pub struct WebSearchTool {
    definition: ToolDefinition,
    client: reqwest::Client,
}

impl WebSearchTool {
    /// Create a new web search tool
    #[must_use]
    pub fn new() -> Self {
        let definition = ToolDefinition::new(
            "web_search",
            "Search the web with DuckDuckGo. Returns titles, URLs and snippets. \
             Use for documentation, error messages, library versions and anything \
             not in the local codebase.",
        )
        .with_category(ToolCategory::Http)
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query string"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (1-10, default 5)"
                }
            },
            "required": ["query"]
        }));

        let client = reqwest::Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self { definition, client }
    }

    async fn fetch(&self, query: &str) -> Result<String> {
        let form = format!("q={}&kl=wt-wt", urlencoding::encode(query));
        debug!(query = %query, "Fetching DuckDuckGo results");

        let response = self
            .client
            .post(SEARCH_URL)
            .header(USER_AGENT, BROWSER_AGENT)
            .header(REFERER, "https://html.duckduckgo.com/")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::ACCEPTED {
            warn!(status = %status, "Web search rate limited");
            return Err(Error::Network(
                "web search is rate limited; try again later".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(Error::Network(format!("search endpoint returned {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        if html.contains("anomaly-modal") {
            warn!("DuckDuckGo returned a CAPTCHA page");
            return Err(Error::Network(
                "web search is rate limited (CAPTCHA); try again later".to_string(),
            ));
        }
        Ok(html)
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();

        let query = input
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidInput("Missing 'query' parameter".to_string()))?;
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("Query must not be empty".to_string()));
        }

        let max_results = input
            .get("max_results")
            .and_then(|v| v.as_u64())
            .map_or(DEFAULT_MAX_RESULTS, |n| (n as usize).clamp(1, MAX_RESULTS_CAP));

        let html = self.fetch(query).await?;
        let results = parse_search_results(&html, max_results);

        Ok(ToolResult::success(
            serde_json::Value::String(render_results(query, &results)),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// Format results as a numbered list
#[must_use]
pub fn render_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No web results for '{query}'.");
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n   {}\n   {}", i + 1, r.title, r.url, r.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse search results from DuckDuckGo HTML
#[must_use]
pub fn parse_search_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let snippets: Vec<String> = SNIPPET_RE
        .captures_iter(html)
        .map(|cap| strip_html_tags(cap.get(1).map_or("", |m| m.as_str())))
        .collect();

    TITLE_RE
        .captures_iter(html)
        .enumerate()
        .map(|(i, cap)| SearchResult {
            url: extract_real_url(cap.get(1).map_or("", |m| m.as_str())),
            title: strip_html_tags(cap.get(2).map_or("", |m| m.as_str())),
            snippet: snippets.get(i).cloned().unwrap_or_default(),
        })
        .filter(|r| !r.url.is_empty() && !r.title.is_empty())
        .take(max_results)
        .collect()
}

/// DuckDuckGo wraps URLs as `//duckduckgo.com/l/?uddg=REAL_URL&...`
fn extract_real_url(raw: &str) -> String {
    let Some(pos) = raw.find("uddg=") else {
        return raw.to_string();
    };
    let rest = &raw[pos + 5..];
    let end = rest.find('&').unwrap_or(rest.len());
    urlencoding::decode(&rest[..end])
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| rest[..end].to_string())
}

fn strip_html_tags(s: &str) -> String {
    TAG_RE
        .replace_all(s, "")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}
