//! Routing strategy — which tools to offer for a user turn.

use crate::tool::ToolSpec;

/// Decides, from raw user text, which tools the model is offered.
///
/// An empty result means no tools are offered for this turn. Classification
/// never fails.
pub trait ToolClassifier: Send + Sync {
    fn classify(&self, user_text: &str) -> Vec<ToolSpec>;
}

/// Offers nothing. Useful for plain chat and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTools;

impl ToolClassifier for NoTools {
    fn classify(&self, _user_text: &str) -> Vec<ToolSpec> {
        Vec::new()
    }
}
