//! Yahoo Finance news scraper.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use newsdesk_core::error::ToolError;
use newsdesk_retrieval::PageFetcher;
use scraper::{Html, Selector};

use super::{
    ANCHOR, Article, NewsSource, ScrapeSettings, all_texts, first_datetime, first_text,
    parse_selector, push_unique, scrape,
};

const ARTICLE_PREFIX: &str = "https://finance.yahoo.com/";

static LINK_CONTAINER: LazyLock<Selector> = LazyLock::new(|| parse_selector("div.yf-18q3fnf"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| parse_selector("div.cover-title.yf-1at0uqp"));
static BODY: LazyLock<Selector> = LazyLock::new(|| parse_selector("p.yf-1pe5jgt"));
static TIME: LazyLock<Selector> =
    LazyLock::new(|| parse_selector("time.byline-attr-meta-time"));

pub struct YahooFinanceNews {
    fetcher: Arc<dyn PageFetcher>,
    settings: ScrapeSettings,
}

impl YahooFinanceNews {
    pub fn new(fetcher: Arc<dyn PageFetcher>, settings: ScrapeSettings) -> Self {
        Self { fetcher, settings }
    }

    pub fn listing_url(symbol: &str) -> String {
        format!("https://finance.yahoo.com/quote/{symbol}/news/")
    }
}

#[async_trait]
impl NewsSource for YahooFinanceNews {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn snapshot_name(&self, symbol: &str) -> String {
        format!("{symbol}_news_articles.json")
    }

    async fn fetch_articles(&self, symbol: &str) -> Result<Vec<Article>, ToolError> {
        scrape(
            &self.fetcher,
            &self.settings,
            "stock_news",
            &Self::listing_url(symbol),
            extract_links,
            parse_article,
        )
        .await
    }
}

/// First Yahoo-hosted link in each story container.
fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut urls = Vec::new();
    for container in document.select(&LINK_CONTAINER) {
        let href = container
            .select(&ANCHOR)
            .next()
            .and_then(|a| a.value().attr("href"));
        if let Some(href) = href.filter(|h| h.starts_with(ARTICLE_PREFIX)) {
            push_unique(&mut urls, href);
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
