//! Page fetching.
//!
//! [`PageFetcher`] is the seam the pipeline fetches through; [`HttpFetcher`]
//! is the reqwest implementation used in production.

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use tracing::debug;

/// Maximum response body size (5 MB)
pub const MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

/// Why a single page could not be fetched.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Response from {url} too large: {bytes} bytes")]
    TooLarge { url: String, bytes: u64 },

    #[error("Request to {url} timed out")]
    Timeout { url: String },
}

/// Fetches the raw body of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed [`PageFetcher`].
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), user_agent)
    }

    pub fn with_client(client: reqwest::Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_length = response.content_length().unwrap_or(0);
        if content_length > MAX_BODY_SIZE as u64 {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                bytes: content_length,
            });
        }

        let body = response.bytes().await.map_err(|e| network_error(url, e))?;
        if body.len() > MAX_BODY_SIZE {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                bytes: body.len() as u64,
            });
        }

        debug!(url, bytes = body.len(), "Fetched page");
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn network_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}
