//! Keyword routing — picks the tools offered for a user turn.

use newsdesk_config::RoutingRule;
use newsdesk_core::routing::ToolClassifier;
use newsdesk_core::tool::{ToolRegistry, ToolSpec};
use tracing::{debug, warn};

struct Route {
    spec: ToolSpec,
    keywords: Vec<String>,
    priority_keywords: Vec<String>,
}

impl Route {
    fn is_candidate(&self, text: &str) -> bool {
        contains_any(text, &self.keywords)
    }

    fn has_priority(&self, text: &str) -> bool {
        contains_any(text, &self.priority_keywords)
    }
}

/// Case-insensitive substring routing over an ordered rule table.
///
/// A tool is a candidate when any of its keywords occurs in the user text.
/// Priority keywords only break ties: with several candidates, the first one
/// whose priority keywords match is offered alone; otherwise all candidates
/// are offered in rule order.
pub struct KeywordRouter {
    routes: Vec<Route>,
}

impl KeywordRouter {
    /// Build from rules, resolving tool names against `registry`.
    ///
    /// Rules naming an unregistered tool are dropped with a warning.
    pub fn new(rules: &[RoutingRule], registry: &ToolRegistry) -> Self {
        let routes = rules
            .iter()
            .filter_map(|rule| {
                let Some(spec) = registry.spec(&rule.tool) else {
                    warn!(tool = %rule.tool, "Routing rule names an unregistered tool");
                    return None;
                };
                Some(Route {
                    spec: spec.clone(),
                    keywords: lowercase(&rule.keywords),
                    priority_keywords: lowercase(&rule.priority_keywords),
                })
            })
            .collect();
        Self { routes }
    }

    /// Tools to offer for `user_text`, possibly none.
    pub fn route(&self, user_text: &str) -> Vec<ToolSpec> {
        let text = user_text.to_lowercase();
        let candidates: Vec<&Route> = self.routes.iter().filter(|r| r.is_candidate(&text)).collect();

        let selected: Vec<ToolSpec> = match candidates.as_slice() {
            [] => Vec::new(),
            [only] => vec![only.spec.clone()],
            many => match many.iter().find(|r| r.has_priority(&text)) {
                Some(route) => vec![route.spec.clone()],
                None => many.iter().map(|r| r.spec.clone()).collect(),
            },
        };

        debug!(
            tools = ?selected.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "Routed user turn"
        );
        selected
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl ToolClassifier for KeywordRouter {
    fn classify(&self, user_text: &str) -> Vec<ToolSpec> {
        self.route(user_text)
    }
}

fn lowercase(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn contains_any(text: &str, words: &[String]) -> bool {
    words.iter().any(|w| text.contains(w.as_str()))
}
