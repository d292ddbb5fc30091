pub mod chat;
pub mod config_cmd;
pub mod news;
pub mod search;

use std::sync::Arc;

use newsdesk_agent::AgentRuntime;
use newsdesk_config::AppConfig;
use newsdesk_core::event::EventBus;
use newsdesk_core::provider::Provider;
use tracing::{info, warn};

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Provider, tools and router wired from config.
pub fn build_runtime(config: &AppConfig) -> Result<AgentRuntime, Box<dyn std::error::Error>> {
    let providers = newsdesk_providers::build_from_config(config);
    let provider = providers
        .default()
        .ok_or_else(|| format!("Provider '{}' is not configured", config.default_provider))?;

    let event_bus = Arc::new(EventBus::default());
    let tools = Arc::new(newsdesk_tools::default_registry(config, event_bus.clone())?);

    info!(
        provider = %config.default_provider,
        model = %config.default_model,
        tools = tools.len(),
        "Runtime ready"
    );
    Ok(AgentRuntime::from_config(config, provider, tools, event_bus))
}

/// Check the provider once. An unreachable provider is reported, not fatal.
pub async fn check_provider(provider: &dyn Provider) -> bool {
    match provider.health_check().await {
        Ok(true) => true,
        Ok(false) => {
            warn!(provider = provider.name(), "Provider failed its health check");
            false
        }
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "Provider is unreachable");
            false
        }
    }
}
