//! MarketWatch news scraper.
//!
//! MarketWatch has shipped several headline layouts; links are collected
//! from each known selector in turn and de-duplicated in first-seen order.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use newsdesk_core::error::ToolError;
use newsdesk_retrieval::PageFetcher;
use scraper::{Html, Selector};

use super::{
    Article, NewsSource, ScrapeSettings, all_texts, first_datetime, first_text, parse_selector,
    push_unique, scrape,
};

const STORY_MARKER: &str = "marketwatch.com/story/";

static HEADLINE_LINKS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "h3.article__headline a.link",
        "div.article__headline a",
        "a.article__headline",
    ]
    .into_iter()
    .map(parse_selector)
    .collect()
});
static TITLE: LazyLock<Selector> = LazyLock::new(|| parse_selector("h1.article__headline"));
static BODY: LazyLock<Selector> = LazyLock::new(|| parse_selector("p"));
static TIME: LazyLock<Selector> = LazyLock::new(|| parse_selector("time"));

pub struct MarketWatchNews {
    fetcher: Arc<dyn PageFetcher>,
    settings: ScrapeSettings,
}

impl MarketWatchNews {
    pub fn new(fetcher: Arc<dyn PageFetcher>, settings: ScrapeSettings) -> Self {
        Self { fetcher, settings }
    }

    pub fn listing_url(symbol: &str) -> String {
        format!("https://www.marketwatch.com/investing/stock/{symbol}?mod=search_symbol")
    }
}

#[async_trait]
impl NewsSource for MarketWatchNews {
    fn name(&self) -> &str {
        "marketwatch"
    }

    fn snapshot_name(&self, symbol: &str) -> String {
        format!("{symbol}_news_articles_marketWatch.json")
    }

    async fn fetch_articles(&self, symbol: &str) -> Result<Vec<Article>, ToolError> {
        scrape(
            &self.fetcher,
            &self.settings,
            "market_news",
            &Self::listing_url(symbol),
            extract_links,
            parse_article,
        )
        .await
    }
}

fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut urls = Vec::new();
    for selector in HEADLINE_LINKS.iter() {
        for link in document.select(selector) {
            if let Some(href) = link.value().attr("href").filter(|h| h.contains(STORY_MARKER)) {
                push_unique(&mut urls, href);
            }
        }
    }
    urls
}

fn parse_article(url: &str, html: &str) -> Article {
    let document = Html::parse_document(html);
    Article {
        title: first_text(&document, &TITLE),
        content: all_texts(&document, &BODY),
        url: url.to_string(),
        timestamp: first_datetime(&document, &TIME),
    }
}
