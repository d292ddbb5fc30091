//! The agent turn state machine.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use newsdesk_core::error::{Error, ToolError};
use newsdesk_core::event::{DomainEvent, EventBus};
use newsdesk_core::message::{ConversationState, Turn};
use newsdesk_core::provider::{Provider, ProviderRequest, ProviderResponse, RequestOptions};
use newsdesk_core::routing::ToolClassifier;
use newsdesk_core::tool::{ToolInvocationRequest, ToolRegistry, ToolResult, ToolSpec};
use newsdesk_tools::{STOCK_NEWS, USER_TEXT_ARG};
use tracing::{debug, info, warn};

/// Where the loop is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for user input
    Idle,
    /// First model call in flight, candidate tools offered
    AwaitingModel,
    /// The model asked for tools; they are being executed
    ToolRequested,
    /// Second model call in flight, no tools offered
    AwaitingFinal,
    /// The final assistant turn is in the transcript
    Answered,
}

/// What a processed turn produced.
#[derive(Debug, Clone)]
pub struct Reply {
    /// The final assistant turn's content (or the error turn's)
    pub content: String,
    /// Tool calls executed this turn, in call order
    pub tool_results: Vec<ToolResult>,
    /// Whether the turn ended in a contained failure
    pub failed: bool,
}

/// Processes user turns against one exclusively owned transcript.
///
/// Each turn: route the user text, ask the model with the candidate tools,
/// run any requested tools in call order, then ask the model once more with
/// no tools offered. Any failure is contained at the turn boundary as an
/// assistant error turn.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    model: String,
    options: RequestOptions,
    tools: Arc<ToolRegistry>,
    router: Arc<dyn ToolClassifier>,
    event_bus: Arc<EventBus>,
    error_prefix: String,
    conversation: ConversationState,
    state: LoopState,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        router: Arc<dyn ToolClassifier>,
        event_bus: Arc<EventBus>,
        conversation: ConversationState,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            options: RequestOptions::default(),
            tools,
            router,
            event_bus,
            error_prefix: "Sorry, I couldn't complete that request:".into(),
            conversation,
            state: LoopState::Idle,
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Text placed before the error in a failed turn's assistant reply.
    pub fn with_error_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.error_prefix = prefix.into();
        self
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Reset the transcript to its system turn. Valid in any state.
    pub fn clear(&mut self) {
        self.conversation.clear();
        self.state = LoopState::Idle;
        self.event_bus.publish(DomainEvent::TranscriptCleared {
            conversation_id: self.conversation.id().to_string(),
            timestamp: Utc::now(),
        });
        info!(conversation_id = %self.conversation.id(), "Transcript cleared");
    }

    /// Process one user turn. Never fails: errors become an assistant turn.
    pub async fn process(&mut self, user_text: &str) -> Reply {
        info!(
            conversation_id = %self.conversation.id(),
            turns = self.conversation.len(),
            "Processing user turn"
        );

        self.recover_interrupted_turn();

        let mut tool_results = Vec::new();
        let outcome = self.run_turn(user_text, &mut tool_results).await;
        let reply = match outcome {
            Ok(content) => Reply {
                content,
                tool_results,
                failed: false,
            },
            Err(e) => Reply {
                content: self.contain(e),
                tool_results,
                failed: true,
            },
        };

        self.state = LoopState::Idle;
        reply
    }

    /// A turn whose future was dropped leaves the loop mid-state and may leave
    /// tool calls without results. Close them so the next request is valid.
    fn recover_interrupted_turn(&mut self) {
        if self.state == LoopState::Idle {
            return;
        }
        let pending = self.conversation.unanswered_calls();
        warn!(
            conversation_id = %self.conversation.id(),
            state = ?self.state,
            unanswered = pending.len(),
            "Recovering from an interrupted turn"
        );
        for call in &pending {
            let result = ToolResult::failure(call, &ToolError::Cancelled(call.tool_name.clone()));
            if let Err(e) = self
                .conversation
                .append(Turn::tool_result(call, result.turn_content()))
            {
                warn!(error = %e, "Could not close an interrupted tool call");
            }
        }
        self.state = LoopState::Idle;
    }

    async fn run_turn(
        &mut self,
        user_text: &str,
        tool_results: &mut Vec<ToolResult>,
    ) -> Result<String, Error> {
        self.conversation.append(Turn::user(user_text))?;

        let offered = self.router.classify(user_text);
        self.state = LoopState::AwaitingModel;
        let response = self.call_model(offered.clone()).await?;

        if !response.turn.requests_tools() {
            return self.answer(response);
        }

        self.state = LoopState::ToolRequested;
        let calls = response.turn.tool_calls.clone();
        debug!(
            conversation_id = %self.conversation.id(),
            tool_count = calls.len(),
            "Executing tool calls"
        );
        self.conversation.append(response.turn)?;

        for call in &calls {
            let result = self.execute(call, &offered, user_text).await;
            self.conversation
                .append(Turn::tool_result(call, result.turn_content()))?;
            tool_results.push(result);
        }

        self.state = LoopState::AwaitingFinal;
        let mut response = self.call_model(Vec::new()).await?;
        if response.turn.requests_tools() {
            warn!(
                conversation_id = %self.conversation.id(),
                "Model requested tools in the final call; ignoring them"
            );
            response.turn = Turn::assistant(response.turn.content);
        }
        self.answer(response)
    }

    async fn call_model(&self, tools: Vec<ToolSpec>) -> Result<ProviderResponse, Error> {
        let request = ProviderRequest {
            model: self.model.clone(),
            turns: self.conversation.turns().to_vec(),
            tools,
            options: self.options.clone(),
        };
        Ok(self.provider.complete(request).await?)
    }

    fn answer(&mut self, response: ProviderResponse) -> Result<String, Error> {
        if let Some(usage) = &response.usage {
            self.event_bus.publish(DomainEvent::ResponseGenerated {
                conversation_id: self.conversation.id().to_string(),
                model: response.model.clone(),
                tokens_used: usage.total_tokens,
                timestamp: Utc::now(),
            });
        }
        let content = response.turn.content.clone();
        self.conversation.append(response.turn)?;
        self.state = LoopState::Answered;
        Ok(content)
    }

    /// Run one requested call. Calls for tools not offered this turn are
    /// answered with a `not offered` result instead of being executed.
    async fn execute(
        &self,
        call: &ToolInvocationRequest,
        offered: &[ToolSpec],
        user_text: &str,
    ) -> ToolResult {
        let start = Instant::now();
        let result = if self.tools.contains(&call.tool_name)
            && !offered.iter().any(|s| s.name == call.tool_name)
        {
            warn!(tool = %call.tool_name, "Model called a tool that was not offered");
            ToolResult::failure(call, &ToolError::NotOffered(call.tool_name.clone()))
        } else if call.tool_name == STOCK_NEWS {
            let mut call = call.clone();
            call.arguments
                .insert(USER_TEXT_ARG.into(), serde_json::Value::from(user_text));
            self.tools.invoke(&call).await
        } else {
            self.tools.invoke(call).await
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            tool = %call.tool_name,
            status = ?result.status,
            duration_ms,
            "Tool call finished"
        );
        self.event_bus.publish(DomainEvent::ToolExecuted {
            conversation_id: self.conversation.id().to_string(),
            tool_name: call.tool_name.clone(),
            success: result.is_success(),
            duration_ms,
            timestamp: Utc::now(),
        });
        result
    }

    /// Append a user-visible assistant error turn and report it.
    fn contain(&mut self, error: Error) -> String {
        warn!(conversation_id = %self.conversation.id(), error = %error, "Turn failed");
        self.event_bus.publish(DomainEvent::ErrorOccurred {
            context: format!("conversation {}", self.conversation.id()),
            error_message: error.to_string(),
            timestamp: Utc::now(),
        });

        let content = format!("{} {error}", self.error_prefix);
        if let Err(e) = self.conversation.append(Turn::assistant(content.clone())) {
            warn!(error = %e, "Could not record the error turn");
        }
        content
    }
}
