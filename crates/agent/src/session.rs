//! Session store — one [`AgentLoop`] per conversation id.
//!
//! Each loop sits behind its own async mutex, so turns of one conversation
//! run one at a time while different conversations proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use newsdesk_core::message::ConversationId;
use tokio::sync::Mutex;
use tracing::debug;

use crate::loop_runner::AgentLoop;
use crate::runtime::AgentRuntime;

pub type SharedLoop = Arc<Mutex<AgentLoop>>;

pub struct SessionStore {
    runtime: AgentRuntime,
    sessions: Mutex<HashMap<ConversationId, SharedLoop>>,
}

impl SessionStore {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self {
            runtime,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Look up the loop for `id`, creating it on first use.
    pub async fn get_or_create(&self, id: &ConversationId) -> SharedLoop {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(conversation_id = %id, "Creating session");
                Arc::new(Mutex::new(self.runtime.new_loop(id.clone())))
            })
            .clone()
    }

    pub async fn get(&self, id: &ConversationId) -> Option<SharedLoop> {
        self.sessions.lock().await.get(id).cloned()
    }

    /// Drop the session; returns whether it existed.
    pub async fn remove(&self, id: &ConversationId) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn runtime(&self) -> &AgentRuntime {
        &self.runtime
    }
}
