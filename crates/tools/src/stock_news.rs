//! Stock news tool — recent articles for a ticker from Yahoo Finance.
//!
//! Besides the model-supplied `symbol`, the agent loop injects the user's
//! original text as `user_text`. If that text no longer concerns markets or
//! the symbol, the scrape is skipped and the model is told why.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use newsdesk_core::error::ToolError;
use newsdesk_core::tool::{Arguments, ParamType, ParameterSpec, Tool, ToolOutput, ToolSpec};
use serde::Serialize;
use tracing::{info, warn};

use crate::news::{Article, NewsSource, write_snapshot};

pub const STOCK_NEWS: &str = "stock_news";

/// Argument the agent loop fills with the raw user text. It is not part of
/// the offered schema, so the model never sees it.
pub const USER_TEXT_ARG: &str = "user_text";

/// Words that keep a stock-news request relevant.
const MARKET_WORDS: &[&str] = &["stock", "price", "market", "share", "trade", "news"];

pub struct StockNewsTool {
    source: Arc<dyn NewsSource>,
    snapshot_dir: Option<PathBuf>,
    max_chars_per_article: usize,
}

impl StockNewsTool {
    pub fn new(source: Arc<dyn NewsSource>) -> Self {
        Self {
            source,
            snapshot_dir: None,
            max_chars_per_article: 4000,
        }
    }

    pub fn with_snapshot_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.snapshot_dir = dir;
        self
    }

    pub fn with_max_chars_per_article(mut self, max_chars: usize) -> Self {
        self.max_chars_per_article = max_chars;
        self
    }
}

#[async_trait]
impl Tool for StockNewsTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            STOCK_NEWS,
            "Fetch the latest news articles for a given stock ticker symbol. \
             Returns up to 10 articles with title, content, URL and timestamp.",
        )
        .with_parameter(
            "symbol",
            ParameterSpec::required(
                ParamType::String,
                "The stock ticker symbol (e.g., \"NVDA\").",
            ),
        )
    }

    async fn execute(&self, arguments: Arguments) -> Result<ToolOutput, ToolError> {
        let symbol = normalize_symbol(arguments.get("symbol").and_then(|v| v.as_str()))?;

        if let Some(user_text) = arguments.get(USER_TEXT_ARG).and_then(|v| v.as_str())
            && !is_relevant(user_text, &symbol)
        {
            info!(symbol = %symbol, "Skipping stock news: request is not about markets");
            return Ok(ToolOutput {
                output: format!(
                    "Skipped {STOCK_NEWS}: the request does not mention markets or {symbol}, \
                     so no news was fetched. Answer from existing knowledge."
                ),
                data: Some(serde_json::json!({ "skipped": true, "symbol": symbol })),
            });
        }

        articles_output(
            self.source.as_ref(),
            &symbol,
            self.snapshot_dir.as_deref(),
            self.max_chars_per_article,
        )
        .await
    }
}

#[derive(Serialize)]
struct NewsDigest<'a> {
    symbol: &'a str,
    source: &'a str,
    count: usize,
    articles: Vec<Article>,
}

/// Scrape, optionally snapshot, and render articles for the model.
pub(crate) async fn articles_output(
    source: &dyn NewsSource,
    symbol: &str,
    snapshot_dir: Option<&std::path::Path>,
    max_chars_per_article: usize,
) -> Result<ToolOutput, ToolError> {
    let articles = source.fetch_articles(symbol).await?;

    if let Some(dir) = snapshot_dir
        && let Err(e) = write_snapshot(dir, &source.snapshot_name(symbol), &articles).await
    {
        warn!(symbol, error = %e, "Failed to write news snapshot");
    }

    let digest = NewsDigest {
        symbol,
        source: source.name(),
        count: articles.len(),
        articles: articles
            .iter()
            .map(|a| a.condensed(max_chars_per_article))
            .collect(),
    };
    ToolOutput::json(&digest).map_err(|e| ToolError::ExecutionFailed {
        tool_name: source.name().to_string(),
        reason: e.to_string(),
    })
}

/// Uppercase and validate a ticker (letters, digits, `.`, `-`, `^`).
pub(crate) fn normalize_symbol(raw: Option<&str>) -> Result<String, ToolError> {
    let symbol = raw.unwrap_or_default().trim().to_uppercase();
    let valid = (1..=10).contains(&symbol.len())
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^'));
    if valid {
        Ok(symbol)
    } else {
        Err(ToolError::InvalidArguments(format!(
            "'{}' is not a ticker symbol",
            raw.unwrap_or_default()
        )))
    }
}

fn is_relevant(user_text: &str, symbol: &str) -> bool {
    let lower = user_text.to_lowercase();
    MARKET_WORDS.iter().any(|w| lower.contains(w)) || lower.contains(&symbol.to_lowercase())
}
