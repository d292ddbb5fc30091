//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send a transcript to an LLM and get a single
//! normalized [`Turn`] back. Whatever wire format the backend speaks, the
//! response is either a plain assistant turn or an assistant turn carrying
//! tool invocation requests.
//!
//! Implementations: native Ollama, OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Turn;
use crate::tool::ToolSpec;

/// Generation options forwarded to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Context window size in tokens (Ollama `num_ctx`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            context_window: None,
            max_tokens: None,
        }
    }
}

/// A request to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "qwen2.5", "gpt-4o-mini")
    pub model: String,

    /// The ordered transcript, system turn first
    pub turns: Vec<Turn>,

    /// Tools the model may call. Empty means none are offered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,

    #[serde(default)]
    pub options: RequestOptions,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated turn (always `Role::Assistant`)
    pub turn: Turn,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The agent loop calls `complete()` without knowing which backend is in use.
/// There is no retry here; a failed call surfaces once as a [`ProviderError`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Whether the provider answers at all. Checked once before a chat session.
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
