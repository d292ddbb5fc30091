//! Concurrent fetch pipeline.
//!
//! Turns a list of candidate URLs into at most `target_count` cleaned text
//! snippets. Candidates are fetched by a task group bounded by a semaphore;
//! every fetch has its own timeout, and the collector drains results in
//! completion order until it has enough, runs out of work, or hits the
//! overall deadline. Whatever is still in flight at that point is cancelled
//! and abandoned.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use newsdesk_core::event::{DomainEvent, EventBus};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cleaner::ContentCleaner;
use crate::fetcher::{FetchError, PageFetcher};

/// A URL to try, with whatever the discoverer knew about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchCandidate {
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_metadata: BTreeMap<String, String>,
}

impl FetchCandidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source_metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.source_metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Ok,
    Timeout,
    Error,
}

/// Outcome of fetching one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: String,
    pub cleaned_text: String,
    pub status: FetchStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchResult {
    fn rejected(candidate: FetchCandidate, status: FetchStatus, error: String) -> Self {
        Self {
            url: candidate.url,
            cleaned_text: String::new(),
            status,
            source_metadata: candidate.source_metadata,
            error: Some(error),
        }
    }
}

/// Knobs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub target_count: usize,
    pub per_request_timeout: Duration,
    pub overall_deadline: Duration,
    pub max_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target_count: 3,
            per_request_timeout: Duration::from_secs(10),
            overall_deadline: Duration::from_secs(20),
            max_concurrency: 5,
        }
    }
}

/// Why the collector stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// `target_count` good results arrived
    TargetReached,
    /// Every candidate settled first
    Exhausted,
    /// The overall deadline passed
    DeadlineExceeded,
    /// The caller's token was cancelled
    Cancelled,
}

impl std::fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineOutcome::TargetReached => "target_reached",
            PipelineOutcome::Exhausted => "exhausted",
            PipelineOutcome::DeadlineExceeded => "deadline_exceeded",
            PipelineOutcome::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Everything a run observed. `accepted` is in completion order.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub candidates: usize,
    pub accepted: Vec<FetchResult>,
    pub rejected: Vec<FetchResult>,
    pub outcome: PipelineOutcome,
    pub elapsed: Duration,
}

pub struct FetchPipeline {
    fetcher: Arc<dyn PageFetcher>,
    cleaner: ContentCleaner,
    events: Option<Arc<EventBus>>,
}

impl FetchPipeline {
    pub fn new(fetcher: Arc<dyn PageFetcher>, cleaner: ContentCleaner) -> Self {
        Self {
            fetcher,
            cleaner,
            events: None,
        }
    }

    /// Publish a `RetrievalCompleted` event after every run.
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Fetch and clean candidates, returning only the accepted results.
    pub async fn fetch(
        &self,
        candidates: Vec<FetchCandidate>,
        settings: &PipelineSettings,
    ) -> Vec<FetchResult> {
        self.run(candidates, settings, &CancellationToken::new())
            .await
            .accepted
    }

    /// Full run. Cancelling `cancel` stops the run early with what has
    /// been accepted so far.
    pub async fn run(
        &self,
        candidates: Vec<FetchCandidate>,
        settings: &PipelineSettings,
        cancel: &CancellationToken,
    ) -> FetchReport {
        let started = Instant::now();
        let total = candidates.len();
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        if total == 0 || settings.target_count == 0 {
            let outcome = if total == 0 {
                PipelineOutcome::Exhausted
            } else {
                PipelineOutcome::TargetReached
            };
            return self.finish(total, accepted, rejected, outcome, started);
        }

        let deadline = Instant::now() + settings.overall_deadline;
        let workers = cancel.child_token();
        let permits = Arc::new(Semaphore::new(settings.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for candidate in candidates {
            let fetcher = Arc::clone(&self.fetcher);
            let permits = Arc::clone(&permits);
            let token = workers.clone();
            let cleaner = self.cleaner;
            let timeout = settings.per_request_timeout;

            tasks.spawn(async move {
                let _permit = tokio::select! {
                    _ = token.cancelled() => return None,
                    permit = permits.acquire_owned() => permit.ok()?,
                };
                let fetched = tokio::select! {
                    _ = token.cancelled() => return None,
                    r = tokio::time::timeout(timeout, fetcher.fetch(&candidate.url)) => r,
                };
                Some(settle(candidate, fetched, &cleaner))
            });
        }

        let outcome = loop {
            if accepted.len() >= settings.target_count {
                break PipelineOutcome::TargetReached;
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break PipelineOutcome::Cancelled,
                _ = tokio::time::sleep_until(deadline) => break PipelineOutcome::DeadlineExceeded,
                next = tasks.join_next() => next,
            };

            match next {
                None => break PipelineOutcome::Exhausted,
                Some(Ok(Some(result))) if result.status == FetchStatus::Ok => {
                    debug!(url = %result.url, chars = result.cleaned_text.len(), "Accepted fetch result");
                    accepted.push(result);
                }
                Some(Ok(Some(result))) => {
                    debug!(url = %result.url, status = ?result.status, error = ?result.error, "Rejected fetch result");
                    rejected.push(result);
                }
                Some(Ok(None)) => {}
                Some(Err(e)) => warn!(error = %e, "Fetch worker panicked"),
            }
        };

        workers.cancel();
        tasks.abort_all();

        self.finish(total, accepted, rejected, outcome, started)
    }

    fn finish(
        &self,
        candidates: usize,
        accepted: Vec<FetchResult>,
        rejected: Vec<FetchResult>,
        outcome: PipelineOutcome,
        started: Instant,
    ) -> FetchReport {
        let elapsed = started.elapsed();
        info!(
            candidates,
            accepted = accepted.len(),
            rejected = rejected.len(),
            %outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "Fetch pipeline finished"
        );

        if let Some(events) = &self.events {
            events.publish(DomainEvent::RetrievalCompleted {
                candidates,
                accepted: accepted.len(),
                outcome: outcome.to_string(),
                duration_ms: elapsed.as_millis() as u64,
                timestamp: Utc::now(),
            });
        }

        FetchReport {
            candidates,
            accepted,
            rejected,
            outcome,
            elapsed,
        }
    }
}

fn settle(
    candidate: FetchCandidate,
    fetched: Result<Result<String, FetchError>, tokio::time::error::Elapsed>,
    cleaner: &ContentCleaner,
) -> FetchResult {
    match fetched {
        Err(_) => FetchResult::rejected(candidate, FetchStatus::Timeout, "request timed out".into()),
        Ok(Err(FetchError::Timeout { .. })) => {
            FetchResult::rejected(candidate, FetchStatus::Timeout, "request timed out".into())
        }
        Ok(Err(e)) => FetchResult::rejected(candidate, FetchStatus::Error, e.to_string()),
        Ok(Ok(raw)) => {
            let cleaned_text = cleaner.clean(&raw);
            if cleaned_text.is_empty() {
                return FetchResult::rejected(
                    candidate,
                    FetchStatus::Error,
                    "no readable text".into(),
                );
            }
            FetchResult {
                url: candidate.url,
                cleaned_text,
                status: FetchStatus::Ok,
                source_metadata: candidate.source_metadata,
                error: None,
            }
        }
    }
}
