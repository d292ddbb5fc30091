//! Web search tool — search, then read the top hits.
//!
//! Search hits become fetch candidates; the fetch pipeline returns the first
//! few pages that yield readable text within its deadline. When no page
//! makes it, the search snippets alone are returned. Non-empty results are
//! memoized per query.

use std::sync::Arc;

use async_trait::async_trait;
use newsdesk_core::error::ToolError;
use newsdesk_core::tool::{Arguments, ParamType, ParameterSpec, Tool, ToolOutput, ToolSpec};
use newsdesk_retrieval::{FetchPipeline, PipelineSettings, QueryCache, SearchHit, SearchProvider};
use serde::Serialize;
use tracing::{debug, info};

pub const WEB_SEARCH: &str = "web_search";

#[derive(Debug, Clone, Serialize)]
struct Snippet {
    title: String,
    url: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl Snippet {
    fn from_hit(hit: &SearchHit) -> Self {
        Self {
            title: hit.title.clone(),
            url: hit.href.clone(),
            description: hit.description.clone(),
            text: None,
        }
    }
}

pub struct WebSearchTool {
    search: Arc<dyn SearchProvider>,
    pipeline: FetchPipeline,
    settings: PipelineSettings,
    max_results: usize,
    cache: QueryCache<ToolOutput>,
}

impl WebSearchTool {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        pipeline: FetchPipeline,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            search,
            pipeline,
            settings,
            max_results: 5,
            cache: QueryCache::new(32),
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = QueryCache::new(capacity);
        self
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            WEB_SEARCH,
            "Search the web and read the top results. Returns titles, URLs and the \
             readable text of the first pages that load.",
        )
        .with_parameter(
            "query",
            ParameterSpec::required(ParamType::String, "The search query"),
        )
    }

    async fn execute(&self, arguments: Arguments) -> Result<ToolOutput, ToolError> {
        let query = arguments
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        if let Some(cached) = self.cache.get(query).await {
            debug!(query, "Web search cache hit");
            return Ok(cached);
        }

        let hits = self.search.search(query, self.max_results).await;
        if hits.is_empty() {
            info!(query, provider = self.search.name(), "Web search returned nothing");
            return Ok(ToolOutput::text(format!("No web results found for \"{query}\".")));
        }

        let candidates = hits.iter().map(SearchHit::to_candidate).collect();
        let fetched = self.pipeline.fetch(candidates, &self.settings).await;

        let snippets: Vec<Snippet> = if fetched.is_empty() {
            hits.iter().map(Snippet::from_hit).collect()
        } else {
            fetched
                .into_iter()
                .map(|r| {
                    let meta = |k: &str| r.source_metadata.get(k).cloned().unwrap_or_default();
                    Snippet {
                        title: meta("title"),
                        description: meta("description"),
                        url: r.url,
                        text: Some(r.cleaned_text),
                    }
                })
                .collect()
        };

        let output = ToolOutput::json(&snippets).map_err(|e| ToolError::ExecutionFailed {
            tool_name: WEB_SEARCH.into(),
            reason: e.to_string(),
        })?;
        self.cache.insert(query, output.clone()).await;
        Ok(output)
    }
}
