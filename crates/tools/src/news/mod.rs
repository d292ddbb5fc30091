//! News scraping collaborators.
//!
//! A [`NewsSource`] turns a ticker symbol into a list of [`Article`]s. The
//! listing page is fetched first, then up to `max_articles` article pages
//! concurrently; an article page that fails or times out is skipped.

pub mod marketwatch;
pub mod yahoo;

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use newsdesk_core::error::ToolError;
use newsdesk_retrieval::PageFetcher;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use marketwatch::MarketWatchNews;
pub use yahoo::YahooFinanceNews;

/// One scraped article. Fields the page did not carry are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: Option<String>,
    pub content: Vec<String>,
    pub url: String,
    pub timestamp: Option<String>,
}

impl Article {
    /// Keep whole paragraphs until `max_chars` would be exceeded.
    pub fn condensed(&self, max_chars: usize) -> Article {
        let mut used = 0;
        let content = self
            .content
            .iter()
            .take_while(|p| {
                used += p.chars().count();
                used <= max_chars
            })
            .cloned()
            .collect();
        Article {
            content,
            ..self.clone()
        }
    }
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Short source name ("yahoo", "marketwatch").
    fn name(&self) -> &str;

    /// File name for the JSON snapshot of `symbol`'s articles.
    fn snapshot_name(&self, symbol: &str) -> String;

    async fn fetch_articles(&self, symbol: &str) -> Result<Vec<Article>, ToolError>;
}

/// Limits shared by the scrapers.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub max_articles: usize,
    pub request_timeout: Duration,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            max_articles: 10,
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Fetch one page under the scrape timeout.
async fn fetch_page(
    fetcher: &dyn PageFetcher,
    url: &str,
    settings: &ScrapeSettings,
    tool_name: &str,
) -> Result<String, ToolError> {
    match tokio::time::timeout(settings.request_timeout, fetcher.fetch(url)).await {
        Ok(Ok(html)) => Ok(html),
        Ok(Err(e)) => Err(ToolError::ExecutionFailed {
            tool_name: tool_name.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(ToolError::Timeout {
            tool_name: tool_name.to_string(),
            timeout_secs: settings.request_timeout.as_secs(),
        }),
    }
}

/// Fetch the listing page, pick article links, then fetch and parse the
/// articles concurrently. Article order follows link order.
async fn scrape(
    fetcher: &Arc<dyn PageFetcher>,
    settings: &ScrapeSettings,
    source: &str,
    listing_url: &str,
    extract_links: fn(&str) -> Vec<String>,
    parse_article: fn(&str, &str) -> Article,
) -> Result<Vec<Article>, ToolError> {
    let listing = fetch_page(fetcher.as_ref(), listing_url, settings, source).await?;
    let mut links = extract_links(&listing);
    links.truncate(settings.max_articles);
    debug!(source, links = links.len(), "Found article links");

    let pages = join_all(links.iter().map(|url| async move {
        let page = fetch_page(fetcher.as_ref(), url, settings, source).await;
        (url, page)
    }))
    .await;

    let articles: Vec<Article> = pages
        .into_iter()
        .filter_map(|(url, page)| match page {
            Ok(html) => Some(parse_article(url, &html)),
            Err(e) => {
                warn!(source, url = %url, error = %e, "Skipping article");
                None
            }
        })
        .collect();

    info!(source, articles = articles.len(), "Scraped articles");
    Ok(articles)
}

/// Write the articles as pretty JSON into `dir`.
pub async fn write_snapshot(
    dir: &Path,
    file_name: &str,
    articles: &[Article],
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(articles).map_err(std::io::Error::other)?;
    tokio::fs::write(&path, json).await?;
    debug!(path = %path.display(), count = articles.len(), "Wrote news snapshot");
    Ok(path)
}

/// Trimmed text of the first element matching `selector`.
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Non-empty trimmed texts of every element matching `selector`.
fn all_texts(document: &Html, selector: &Selector) -> Vec<String> {
    document
        .select(selector)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `datetime` attribute of the first element matching `selector`.
fn first_datetime(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|t| t.value().attr("datetime"))
        .map(String::from)
}

fn parse_selector(css: &str) -> Selector {
    Selector::parse(css).expect("static CSS selector is valid")
}

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("a[href]"));

/// Push `url` unless already present.
fn push_unique(urls: &mut Vec<String>, url: &str) {
    if !urls.iter().any(|u| u == url) {
        urls.push(url.to_string());
    }
}
