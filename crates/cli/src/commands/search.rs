//! `newsdesk search` — Web search through the fetch pipeline.
//!
//! Ctrl+C cancels the pipeline and prints whatever was accepted so far.

use std::sync::Arc;

use newsdesk_retrieval::{
    CancellationToken, ContentCleaner, DuckDuckGoSearch, FetchPipeline, HttpFetcher,
    SearchHit, SearchProvider,
};
use newsdesk_tools::pipeline_settings;

use super::load_config;

pub async fn run(query: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let retrieval = &config.retrieval;

    let search = DuckDuckGoSearch::new(retrieval.user_agent.clone());
    let hits = search.search(query, retrieval.search_results).await;
    if hits.is_empty() {
        println!("No results for \"{query}\".");
        return Ok(());
    }

    let pipeline = FetchPipeline::new(
        Arc::new(HttpFetcher::new(retrieval.user_agent.clone())),
        ContentCleaner::new(retrieval.max_text_length),
    );
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let candidates = hits.iter().map(SearchHit::to_candidate).collect();
    let report = pipeline
        .run(candidates, &pipeline_settings(retrieval), &cancel)
        .await;

    eprintln!(
        "  {} of {} pages used ({}, {} ms)",
        report.accepted.len(),
        report.candidates,
        report.outcome,
        report.elapsed.as_millis()
    );
    println!();
    for result in &report.accepted {
        let title = result.source_metadata.get("title").map(String::as_str).unwrap_or("");
        println!("## {title}");
        println!("{}", result.url);
        println!();
        println!("{}", result.cleaned_text);
        println!();
    }
    Ok(())
}
