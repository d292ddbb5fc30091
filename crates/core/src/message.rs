//! Turn and transcript domain types.
//!
//! These are the core value objects that flow through the entire system:
//! the user types a turn → the agent routes it → the provider answers →
//! tool results are folded back in as tool turns.
//!
//! Every message shape a provider hands back is normalized into a [`Turn`]
//! at the provider boundary; nothing downstream branches on wire formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TranscriptError;
use crate::tool::ToolInvocationRequest;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user
    User,
    /// The language model
    Assistant,
    /// Tool execution result
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        f.write_str(s)
    }
}

/// A single dialogue entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    /// Who produced this turn
    pub role: Role,

    /// The text content
    pub content: String,

    /// For tool turns, the tool that produced the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// Tool invocations requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocationRequest>,

    /// If this is a tool turn, which invocation it answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_name: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create an assistant turn that requests tool invocations.
    pub fn tool_request(content: impl Into<String>, calls: Vec<ToolInvocationRequest>) -> Self {
        let mut turn = Self::with_role(Role::Assistant, content.into());
        turn.tool_calls = calls;
        turn
    }

    /// Create a tool result turn answering `call`.
    pub fn tool_result(call: &ToolInvocationRequest, content: impl Into<String>) -> Self {
        let mut turn = Self::with_role(Role::Tool, content.into());
        turn.tool_name = Some(call.tool_name.clone());
        turn.tool_call_id = Some(call.id.clone());
        turn
    }

    /// Whether this assistant turn asks for tools.
    pub fn requests_tools(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// An ordered transcript that always starts with its system turn.
///
/// Fields are private: all mutation goes through [`append`](Self::append)
/// and [`clear`](Self::clear), which keep the ordering rules intact.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    id: ConversationId,
    turns: Vec<Turn>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// Create a transcript holding only the system turn.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self::with_id(ConversationId::new(), system_prompt)
    }

    /// Create a transcript for a known conversation ID.
    pub fn with_id(id: ConversationId, system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            turns: vec![Turn::system(system_prompt)],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false: the system turn is never removed.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn system_turn(&self) -> &Turn {
        &self.turns[0]
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Append a turn, enforcing the transcript ordering rules.
    pub fn append(&mut self, turn: Turn) -> Result<(), TranscriptError> {
        match turn.role {
            Role::System => return Err(TranscriptError::MisplacedSystemTurn),
            Role::Tool => {
                let call_id = turn.tool_call_id.clone().unwrap_or_default();
                if !self.has_pending_request(&call_id) {
                    return Err(TranscriptError::OrphanToolTurn { call_id });
                }
            }
            Role::User | Role::Assistant => {}
        }
        self.updated_at = Utc::now();
        self.turns.push(turn);
        Ok(())
    }

    /// Reset the transcript to just the system turn.
    pub fn clear(&mut self) {
        self.turns.truncate(1);
        self.updated_at = Utc::now();
    }

    /// Calls from the latest tool request that have no tool turn yet.
    pub fn unanswered_calls(&self) -> Vec<ToolInvocationRequest> {
        let answered: Vec<&str> = self
            .turns
            .iter()
            .rev()
            .take_while(|t| t.role == Role::Tool)
            .filter_map(|t| t.tool_call_id.as_deref())
            .collect();
        match self.turns.iter().rev().find(|t| t.role != Role::Tool) {
            Some(request) if request.requests_tools() => request
                .tool_calls
                .iter()
                .filter(|c| !answered.contains(&c.id.as_str()))
                .cloned()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The nearest non-tool turn must be an assistant turn that issued `call_id`.
    fn has_pending_request(&self, call_id: &str) -> bool {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role != Role::Tool)
            .is_some_and(|t| t.requests_tools() && t.tool_calls.iter().any(|c| c.id == call_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> ToolInvocationRequest {
        ToolInvocationRequest::new(id, "stock_news", serde_json::Map::new())
    }

    #[test]
    fn new_transcript_starts_with_system_turn() {
        let conv = ConversationState::new("You are helpful.");
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.system_turn().role, Role::System);
        assert_eq!(conv.system_turn().content, "You are helpful.");
    }

    #[test]
    fn append_tracks_updates() {
        let mut conv = ConversationState::new("sys");
        let created = conv.created_at();

        conv.append(Turn::user("First message")).unwrap();
        assert_eq!(conv.len(), 2);
        assert!(conv.updated_at() >= created);
        assert_eq!(conv.last().unwrap().content, "First message");
    }

    #[test]
    fn system_turn_cannot_be_appended() {
        let mut conv = ConversationState::new("sys");
        let err = conv.append(Turn::system("again")).unwrap_err();
        assert_eq!(err, TranscriptError::MisplacedSystemTurn);
    }

    #[test]
    fn tool_turn_requires_matching_request() {
        let mut conv = ConversationState::new("sys");
        conv.append(Turn::user("news?")).unwrap();

        let orphan = Turn::tool_result(&call("call_1"), "{}");
        assert!(conv.append(orphan).is_err());

        conv.append(Turn::tool_request("", vec![call("call_1"), call("call_2")]))
            .unwrap();
        conv.append(Turn::tool_result(&call("call_1"), "a")).unwrap();
        conv.append(Turn::tool_result(&call("call_2"), "b")).unwrap();

        let unknown = Turn::tool_result(&call("call_9"), "c");
        assert!(matches!(
            conv.append(unknown),
            Err(TranscriptError::OrphanToolTurn { call_id }) if call_id == "call_9"
        ));
    }

    #[test]
    fn tool_turn_after_plain_answer_is_rejected() {
        let mut conv = ConversationState::new("sys");
        conv.append(Turn::user("hi")).unwrap();
        conv.append(Turn::assistant("hello")).unwrap();
        assert!(conv.append(Turn::tool_result(&call("call_1"), "x")).is_err());
    }

    #[test]
    fn unanswered_calls_track_the_latest_request() {
        let mut conv = ConversationState::new("sys");
        conv.append(Turn::user("two tickers")).unwrap();
        assert!(conv.unanswered_calls().is_empty());

        conv.append(Turn::tool_request("", vec![call("c1"), call("c2")])).unwrap();
        conv.append(Turn::tool_result(&call("c1"), "ok")).unwrap();
        let open: Vec<String> = conv.unanswered_calls().into_iter().map(|c| c.id).collect();
        assert_eq!(open, vec!["c2"]);

        conv.append(Turn::tool_result(&call("c2"), "ok")).unwrap();
        assert!(conv.unanswered_calls().is_empty());
    }

    #[test]
    fn clear_keeps_only_system_turn() {
        let mut conv = ConversationState::new("sys prompt");
        conv.append(Turn::user("one")).unwrap();
        conv.append(Turn::tool_request("", vec![call("c")])).unwrap();
        conv.append(Turn::tool_result(&call("c"), "out")).unwrap();
        conv.append(Turn::assistant("done")).unwrap();

        conv.clear();
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.system_turn().content, "sys prompt");

        conv.clear();
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn turn_serializes_role_lowercase() {
        let json = serde_json::to_string(&Turn::user("Test")).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("tool_calls"));
    }
}
