//! Configuration loading, validation, and management for Newsdesk.
//!
//! Loads configuration from `~/.newsdesk/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.newsdesk/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Context window in tokens (Ollama `num_ctx`)
    #[serde(default = "default_context_window")]
    pub context_window: u32,

    /// Max tokens per LLM response; unset lets the backend decide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_tokens: Option<u32>,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Conversation loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Fetch pipeline and web search settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// News scraper settings
    #[serde(default)]
    pub news: NewsConfig,

    /// Keyword routing table
    #[serde(default)]
    pub routing: RoutingConfig,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "qwen2.5".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_context_window() -> u32 {
    8192
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("context_window", &self.context_window)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("agent", &self.agent)
            .field("retrieval", &self.retrieval)
            .field("news", &self.news)
            .field("routing", &self.routing)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Prepended to the assistant turn that reports a failed model call
    #[serde(default = "default_error_prefix")]
    pub error_prefix: String,
}

fn default_system_prompt() -> String {
    "You are an AI assistant specializing in information retrieval and analysis. \
     Only call a tool when the question needs real-time or current information \
     that you cannot answer from your own knowledge, and then use only the most \
     relevant tool. Keep the conversation natural and refer back to earlier \
     turns when relevant."
        .into()
}
fn default_error_prefix() -> String {
    "Sorry, I couldn't complete that request:".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            error_prefix: default_error_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Good snippets to collect before the pipeline stops waiting
    #[serde(default = "default_target_count")]
    pub target_count: usize,

    #[serde(default = "default_per_request_timeout")]
    pub per_request_timeout_secs: u64,

    #[serde(default = "default_overall_deadline")]
    pub overall_deadline_secs: u64,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Characters kept per cleaned page
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    /// Search hits requested per query
    #[serde(default = "default_search_results")]
    pub search_results: usize,

    /// Queries memoized by the web search tool; 0 disables the cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_target_count() -> usize {
    3
}
fn default_per_request_timeout() -> u64 {
    10
}
fn default_overall_deadline() -> u64 {
    20
}
fn default_max_concurrency() -> usize {
    5
}
fn default_max_text_length() -> usize {
    4000
}
fn default_search_results() -> usize {
    5
}
fn default_cache_capacity() -> usize {
    32
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .into()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            target_count: default_target_count(),
            per_request_timeout_secs: default_per_request_timeout(),
            overall_deadline_secs: default_overall_deadline(),
            max_concurrency: default_max_concurrency(),
            max_text_length: default_max_text_length(),
            search_results: default_search_results(),
            cache_capacity: default_cache_capacity(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,

    #[serde(default = "default_news_timeout")]
    pub request_timeout_secs: u64,

    /// When set, scraped articles are also written here as JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_dir: Option<PathBuf>,
}

fn default_max_articles() -> usize {
    10
}
fn default_news_timeout() -> u64 {
    15
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            max_articles: default_max_articles(),
            request_timeout_secs: default_news_timeout(),
            snapshot_dir: None,
        }
    }
}

/// One row of the routing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Tool name this rule offers
    pub tool: String,

    /// Any of these makes the tool a candidate
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Any of these selects the tool alone when several are candidates
    #[serde(default)]
    pub priority_keywords: Vec<String>,
}

impl RoutingRule {
    pub fn new(tool: &str, keywords: &[&str], priority_keywords: &[&str]) -> Self {
        Self {
            tool: tool.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            priority_keywords: priority_keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Ordered routing rules. Order is the tie-break order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_rules")]
    pub rules: Vec<RoutingRule>,
}

fn default_rules() -> Vec<RoutingRule> {
    vec![
        RoutingRule::new(
            "market_news",
            &["marketwatch", "market watch"],
            &["marketwatch", "market watch"],
        ),
        RoutingRule::new(
            "stock_news",
            &["stock", "price", "market", "share", "trade", "news"],
            &["news", "article", "story"],
        ),
        RoutingRule::new(
            "web_search",
            &["search", "look up", "lookup", "google", "web", "find out"],
            &["search", "look up", "google", "web"],
        ),
    ]
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.newsdesk/config.toml).
    ///
    /// Environment overrides:
    /// - `NEWSDESK_API_KEY`, then `OPENAI_API_KEY`, then `OPENROUTER_API_KEY`
    /// - `NEWSDESK_PROVIDER`, `NEWSDESK_MODEL`
    /// - `OLLAMA_HOST` for the Ollama endpoint
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("NEWSDESK_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("NEWSDESK_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("NEWSDESK_MODEL") {
            self.default_model = model;
        }

        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            self.providers.entry("ollama".into()).or_default().api_url = Some(host);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".newsdesk")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let r = &self.retrieval;
        if r.target_count == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.target_count must be > 0".into(),
            ));
        }
        if r.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.max_concurrency must be > 0".into(),
            ));
        }
        if r.per_request_timeout_secs == 0
            || r.overall_deadline_secs == 0
            || self.news.request_timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "timeouts must be > 0 seconds".into(),
            ));
        }

        if let Some(rule) = self.routing.rules.iter().find(|r| r.tool.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "routing rule with keywords {:?} has an empty tool name",
                rule.keywords
            )));
        }

        Ok(())
    }

    /// API key for a provider: per-provider first, then the global one.
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// Generate a default config TOML string (for the `config init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            context_window: default_context_window(),
            default_max_tokens: None,
            providers: HashMap::new(),
            agent: AgentConfig::default(),
            retrieval: RetrievalConfig::default(),
            news: NewsConfig::default(),
            routing: RoutingConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "ollama");
        assert_eq!(config.retrieval.target_count, 3);
        assert_eq!(config.news.max_articles, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.routing.rules, config.routing.rules);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_target_count_rejected() {
        let mut config = AppConfig::default();
        config.retrieval.target_count = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retrieval.max_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_routing_tool_rejected() {
        let mut config = AppConfig::default();
        config.routing.rules.push(RoutingRule::new(" ", &["x"], &[]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_model, "qwen2.5");
    }

    #[test]
    fn load_from_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
default_model = "llama3.2"

[retrieval]
target_count = 2
max_concurrency = 8

[providers.openai]
api_key = "sk-test"

[[routing.rules]]
tool = "stock_news"
keywords = ["ticker"]
priority_keywords = ["headline"]
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_model, "llama3.2");
        assert_eq!(config.retrieval.target_count, 2);
        assert_eq!(config.retrieval.per_request_timeout_secs, 10);
        assert_eq!(config.routing.rules.len(), 1);
        assert_eq!(config.api_key_for("openai").as_deref(), Some("sk-test"));
        assert_eq!(config.api_key_for("ollama"), None);
    }

    #[test]
    fn invalid_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "default_temperature = \"hot\"").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-other".into()),
                ..ProviderConfig::default()
            },
        );
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(!dbg.contains("sk-other"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("ollama"));
        assert!(toml_str.contains("market_news"));
    }
}
