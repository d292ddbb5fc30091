//! Web search collaborator.
//!
//! [`DuckDuckGoSearch`] scrapes the DuckDuckGo HTML endpoint, which needs no
//! API key. Any failure is logged and turned into an empty hit list.

use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::pipeline::FetchCandidate;

/// DuckDuckGo HTML endpoint (no API key required).
const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";

static RESULT: LazyLock<Selector> = LazyLock::new(|| parse_selector("div.result"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| parse_selector("a.result__a"));
static SNIPPET: LazyLock<Selector> = LazyLock::new(|| parse_selector(".result__snippet"));

fn parse_selector(css: &str) -> Selector {
    Selector::parse(css).expect("static CSS selector is valid")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub href: String,
    pub description: String,
}

impl SearchHit {
    /// Feed a hit to the fetch pipeline, keeping what search knew.
    pub fn to_candidate(&self) -> FetchCandidate {
        FetchCandidate::new(&self.href)
            .with_metadata("title", &self.title)
            .with_metadata("description", &self.description)
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Up to `max_results` hits. Never fails; errors yield an empty list.
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit>;
}

pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
    user_agent: String,
}

impl DuckDuckGoSearch {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DDG_HTML_URL.to_string(),
            user_agent: user_agent.into(),
        }
    }

    /// Point at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn fetch_results_page(&self, query: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit> {
        if query.trim().is_empty() || max_results == 0 {
            return Vec::new();
        }

        match self.fetch_results_page(query).await {
            Ok(html) => {
                let hits = parse_results(&html, max_results);
                debug!(query, hits = hits.len(), "Web search finished");
                hits
            }
            Err(e) => {
                warn!(query, error = %e, "Web search failed");
                Vec::new()
            }
        }
    }
}

/// Extract result entries from a DuckDuckGo HTML results page.
pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let mut hits = Vec::new();

    for result in document.select(&RESULT) {
        if hits.len() >= max_results {
            break;
        }
        if result.value().classes().any(|c| c == "result--ad") {
            continue;
        }
        let Some(anchor) = result.select(&TITLE).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href").and_then(resolve_href) else {
            continue;
        };

        let title = squash(&anchor.text().collect::<String>());
        let description = result
            .select(&SNIPPET)
            .next()
            .map(|s| squash(&s.text().collect::<String>()))
            .unwrap_or_default();

        hits.push(SearchHit {
            title,
            href,
            description,
        });
    }

    hits
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>`.
fn resolve_href(raw: &str) -> Option<String> {
    let absolute = if raw.starts_with("//") {
        format!("https:{raw}")
    } else {
        raw.to_string()
    };
    let url = reqwest::Url::parse(&absolute).ok()?;

    if url.path().starts_with("/l/") {
        return url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <html><body>
      <div class="result results_links result--ad">
        <a class="result__a" href="https://ads.example.com/">Sponsored</a>
      </div>
      <div class="result results_links">
        <h2><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">Rust   Programming Language</a></h2>
        <a class="result__snippet">A language empowering everyone.</a>
      </div>
      <div class="result results_links">
        <a class="result__a" href="https://tokio.rs/">Tokio</a>
        <div class="result__snippet">An asynchronous runtime.</div>
      </div>
      <div class="result results_links">
        <a class="result__a" href="https://docs.rs/">Docs.rs</a>
      </div>
    </body></html>
    "#;

    #[test]
    fn parses_hits_and_skips_ads() {
        let hits = parse_results(PAGE, 5);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "Rust Programming Language");
        assert_eq!(hits[0].href, "https://www.rust-lang.org/");
        assert_eq!(hits[0].description, "A language empowering everyone.");
        assert_eq!(hits[1].href, "https://tokio.rs/");
        assert_eq!(hits[2].description, "");
    }

    #[test]
    fn respects_max_results() {
        assert_eq!(parse_results(PAGE, 2).len(), 2);
        assert!(parse_results("<html></html>", 5).is_empty());
    }

    #[test]
    fn hit_becomes_candidate_with_metadata() {
        let hit = SearchHit {
            title: "Tokio".into(),
            href: "https://tokio.rs/".into(),
            description: "runtime".into(),
        };
        let candidate = hit.to_candidate();
        assert_eq!(candidate.url, "https://tokio.rs/");
        assert_eq!(candidate.source_metadata["title"], "Tokio");
    }

    #[tokio::test]
    async fn failure_yields_empty_list() {
        let search = DuckDuckGoSearch::new("newsdesk-test").with_endpoint("http://127.0.0.1:1/html/");
        assert!(search.search("rust", 5).await.is_empty());
    }
}
