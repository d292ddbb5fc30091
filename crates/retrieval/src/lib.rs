//! Content retrieval for Newsdesk.
//!
//! - [`ContentCleaner`]: markup → bounded plain text
//! - [`FetchPipeline`]: bounded, deadline-aware concurrent fetching
//! - [`QueryCache`]: bounded memo keyed by query text
//! - [`SearchProvider`]: web search collaborator (DuckDuckGo by default)

pub mod cache;
pub mod cleaner;
pub mod fetcher;
pub mod pipeline;
pub mod search;

pub use cache::QueryCache;
pub use cleaner::ContentCleaner;
pub use fetcher::{FetchError, HttpFetcher, PageFetcher};
pub use pipeline::{
    FetchCandidate, FetchPipeline, FetchReport, FetchResult, FetchStatus, PipelineOutcome,
    PipelineSettings,
};
pub use search::{DuckDuckGoSearch, SearchHit, SearchProvider};
pub use tokio_util::sync::CancellationToken;
