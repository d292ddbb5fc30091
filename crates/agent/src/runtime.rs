//! Shared parts every conversation's [`AgentLoop`] is built from.

use std::sync::Arc;

use newsdesk_config::AppConfig;
use newsdesk_core::event::EventBus;
use newsdesk_core::message::{ConversationId, ConversationState};
use newsdesk_core::provider::{Provider, RequestOptions};
use newsdesk_core::routing::ToolClassifier;
use newsdesk_core::tool::ToolRegistry;

use crate::loop_runner::AgentLoop;
use crate::router::KeywordRouter;

/// Provider, tools, router and settings shared across sessions.
#[derive(Clone)]
pub struct AgentRuntime {
    pub provider: Arc<dyn Provider>,
    pub model: String,
    pub options: RequestOptions,
    pub tools: Arc<ToolRegistry>,
    pub router: Arc<dyn ToolClassifier>,
    pub event_bus: Arc<EventBus>,
    pub system_prompt: String,
    pub error_prefix: String,
}

impl AgentRuntime {
    /// Wire a runtime from config, routing with the configured keyword table.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let router = KeywordRouter::new(&config.routing.rules, &tools);
        Self {
            provider,
            model: config.default_model.clone(),
            options: RequestOptions {
                temperature: config.default_temperature,
                context_window: Some(config.context_window),
                max_tokens: config.default_max_tokens,
            },
            tools,
            router: Arc::new(router),
            event_bus,
            system_prompt: config.agent.system_prompt.clone(),
            error_prefix: config.agent.error_prefix.clone(),
        }
    }

    /// A fresh loop over a new transcript for `id`.
    pub fn new_loop(&self, id: ConversationId) -> AgentLoop {
        AgentLoop::new(
            self.provider.clone(),
            self.model.clone(),
            self.tools.clone(),
            self.router.clone(),
            self.event_bus.clone(),
            ConversationState::with_id(id, self.system_prompt.clone()),
        )
        .with_options(self.options.clone())
        .with_error_prefix(self.error_prefix.clone())
    }
}
