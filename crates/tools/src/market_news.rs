//! Market news tool — MarketWatch coverage of a ticker.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use newsdesk_core::error::ToolError;
use newsdesk_core::tool::{Arguments, ParamType, ParameterSpec, Tool, ToolOutput, ToolSpec};

use crate::news::NewsSource;
use crate::stock_news::{articles_output, normalize_symbol};

pub const MARKET_NEWS: &str = "market_news";

pub struct MarketNewsTool {
    source: Arc<dyn NewsSource>,
    snapshot_dir: Option<PathBuf>,
    max_chars_per_article: usize,
}

impl MarketNewsTool {
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
impl Tool for MarketNewsTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            MARKET_NEWS,
            "Fetch recent MarketWatch stories about a stock ticker symbol. \
             Use when the user asks for MarketWatch coverage specifically.",
        )
        .with_parameter(
            "symbol",
            ParameterSpec::required(ParamType::String, "The stock ticker symbol (e.g., \"NVDA\")."),
        )
    }

    async fn execute(&self, arguments: Arguments) -> Result<ToolOutput, ToolError> {
        let symbol = normalize_symbol(arguments.get("symbol").and_then(|v| v.as_str()))?;
        articles_output(
            self.source.as_ref(),
            &symbol,
            self.snapshot_dir.as_deref(),
            self.max_chars_per_article,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::{MarketWatchNews, ScrapeSettings};
    use crate::news::testing::CannedPages;

    #[tokio::test]
    async fn scrapes_marketwatch_for_symbol() {
        let fetcher = CannedPages::new(vec![
            (
                MarketWatchNews::listing_url("TSLA"),
                r#"<a class="article__headline" href="https://www.marketwatch.com/story/tesla">T</a>"#.into(),
            ),
            (
                "https://www.marketwatch.com/story/tesla".into(),
                "<h1 class=\"article__headline\">Tesla rallies</h1><p>Up 5%.</p>".into(),
            ),
        ]);
        let source = Arc::new(MarketWatchNews::new(fetcher, ScrapeSettings::default()));
        let tool = MarketNewsTool::new(source);

        let mut args = Arguments::new();
        args.insert("symbol".into(), "tsla".into());
        let out = tool.execute(args).await.unwrap();

        let data = out.data.unwrap();
        assert_eq!(data["source"], "marketwatch");
        assert_eq!(data["articles"][0]["title"], "Tesla rallies");
        assert!(out.output.contains("Up 5%."));
    }

    #[tokio::test]
    async fn unreachable_listing_fails() {
        let fetcher = CannedPages::new(vec![]);
        let source = Arc::new(MarketWatchNews::new(fetcher, ScrapeSettings::default()));
        let mut args = Arguments::new();
        args.insert("symbol".into(), "TSLA".into());
        let err = MarketNewsTool::new(source).execute(args).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }
}
