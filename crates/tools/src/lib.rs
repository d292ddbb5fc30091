//! Built-in tool implementations for Newsdesk.
//!
//! Tools give the agent read access to the outside world: recent stock
//! news from Yahoo Finance and MarketWatch, and general web search backed
//! by the concurrent fetch pipeline.

pub mod market_news;
pub mod news;
pub mod stock_news;
pub mod web_search;

use std::sync::Arc;
use std::time::Duration;

use newsdesk_config::{AppConfig, NewsConfig, RetrievalConfig};
use newsdesk_core::error::RegistryError;
use newsdesk_core::event::EventBus;
use newsdesk_core::tool::ToolRegistry;
use newsdesk_retrieval::{
    ContentCleaner, DuckDuckGoSearch, FetchPipeline, HttpFetcher, PageFetcher, PipelineSettings,
};

pub use market_news::{MARKET_NEWS, MarketNewsTool};
pub use news::{Article, MarketWatchNews, NewsSource, ScrapeSettings, YahooFinanceNews};
pub use stock_news::{STOCK_NEWS, StockNewsTool, USER_TEXT_ARG};
pub use web_search::{WEB_SEARCH, WebSearchTool};

/// Create the default tool registry: `stock_news`, `market_news` and
/// `web_search`, all sharing one HTTP fetcher.
pub fn default_registry(
    config: &AppConfig,
    events: Arc<EventBus>,
) -> Result<ToolRegistry, RegistryError> {
    let fetcher: Arc<dyn PageFetcher> =
        Arc::new(HttpFetcher::new(config.retrieval.user_agent.clone()));
    let scrape = scrape_settings(&config.news);
    let max_chars = config.retrieval.max_text_length;

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(
        StockNewsTool::new(Arc::new(YahooFinanceNews::new(fetcher.clone(), scrape.clone())))
            .with_snapshot_dir(config.news.snapshot_dir.clone())
            .with_max_chars_per_article(max_chars),
    ))?;
    registry.register(Box::new(
        MarketNewsTool::new(Arc::new(MarketWatchNews::new(fetcher.clone(), scrape)))
            .with_snapshot_dir(config.news.snapshot_dir.clone())
            .with_max_chars_per_article(max_chars),
    ))?;

    let pipeline = FetchPipeline::new(fetcher, ContentCleaner::new(max_chars))
        .with_event_bus(events);
    registry.register(Box::new(
        WebSearchTool::new(
            Arc::new(DuckDuckGoSearch::new(config.retrieval.user_agent.clone())),
            pipeline,
            pipeline_settings(&config.retrieval),
        )
        .with_max_results(config.retrieval.search_results)
        .with_cache_capacity(config.retrieval.cache_capacity),
    ))?;

    Ok(registry)
}

pub fn pipeline_settings(config: &RetrievalConfig) -> PipelineSettings {
    PipelineSettings {
        target_count: config.target_count,
        per_request_timeout: Duration::from_secs(config.per_request_timeout_secs),
        overall_deadline: Duration::from_secs(config.overall_deadline_secs),
        max_concurrency: config.max_concurrency,
    }
}

pub fn scrape_settings(config: &NewsConfig) -> ScrapeSettings {
    ScrapeSettings {
        max_articles: config.max_articles,
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    }
}
