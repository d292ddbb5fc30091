//! LLM Provider implementations for Newsdesk.
//!
//! All providers implement the `newsdesk_core::Provider` trait and hand back
//! a single normalized assistant `Turn`. The router selects the correct
//! provider based on configuration.

pub mod ollama;
pub mod openai_compat;
pub mod router;
mod wire;

pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
