//! `newsdesk news` — Scrape recent articles for a ticker.

use std::sync::Arc;

use clap::ValueEnum;
use newsdesk_retrieval::{HttpFetcher, PageFetcher};
use newsdesk_tools::news::write_snapshot;
use newsdesk_tools::{MarketWatchNews, NewsSource, YahooFinanceNews, scrape_settings};

use super::load_config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NewsSourceArg {
    Yahoo,
    Marketwatch,
}

pub async fn run(symbol: &str, source: NewsSourceArg) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let symbol = symbol.trim().to_uppercase();

    let fetcher: Arc<dyn PageFetcher> =
        Arc::new(HttpFetcher::new(config.retrieval.user_agent.clone()));
    let settings = scrape_settings(&config.news);
    let source: Box<dyn NewsSource> = match source {
        NewsSourceArg::Yahoo => Box::new(YahooFinanceNews::new(fetcher, settings)),
        NewsSourceArg::Marketwatch => Box::new(MarketWatchNews::new(fetcher, settings)),
    };

    let articles = source.fetch_articles(&symbol).await?;

    if let Some(dir) = &config.news.snapshot_dir {
        let path = write_snapshot(dir, &source.snapshot_name(&symbol), &articles).await?;
        eprintln!("  Saved {} articles to {}", articles.len(), path.display());
    }

    println!("{}", serde_json::to_string_pretty(&articles)?);
    Ok(())
}
