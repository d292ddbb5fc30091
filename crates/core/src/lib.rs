//! # Newsdesk Core
//!
//! Domain types, traits, and error definitions for the Newsdesk assistant.
//! This crate has no HTTP or storage dependencies; it defines the model
//! that all other crates implement against.
//!
//! Every seam is a trait here: [`Provider`] for LLM backends, [`Tool`] for
//! retrieval capabilities and [`ToolClassifier`] for routing. Implementations
//! live in their own crates, which keeps test doubles trivial.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod routing;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, RegistryError, Result, ToolError, TranscriptError};
pub use event::{DomainEvent, EventBus};
pub use message::{ConversationId, ConversationState, Role, Turn};
pub use provider::{Provider, ProviderRequest, ProviderResponse, RequestOptions, Usage};
pub use routing::{NoTools, ToolClassifier};
pub use tool::{
    Arguments, ParamType, ParameterSpec, Tool, ToolInvocationRequest, ToolOutput, ToolRegistry,
    ToolResult, ToolSpec, ToolStatus,
};
