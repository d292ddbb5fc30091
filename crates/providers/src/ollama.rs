//! Native Ollama provider (`/api/chat`).
//!
//! Talks to Ollama's own chat endpoint rather than its OpenAI shim so that
//! generation options such as `num_ctx` reach the model. Tool-call arguments
//! arrive as JSON objects and calls carry no IDs, so IDs are minted here.

use async_trait::async_trait;
use newsdesk_core::error::ProviderError;
use newsdesk_core::message::{Role, Turn};
use newsdesk_core::provider::*;
use newsdesk_core::tool::{ToolInvocationRequest, ToolSpec};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::wire::{arguments_from_value, assistant_turn, check_status, mint_call_id, network_error};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url
                .unwrap_or(DEFAULT_OLLAMA_URL)
                .trim_end_matches('/')
                .trim_end_matches("/v1")
                .to_string(),
            client,
        }
    }

    fn to_api_messages(turns: &[Turn]) -> Vec<ApiMessage> {
        turns
            .iter()
            .map(|t| ApiMessage {
                role: t.role.to_string(),
                content: t.content.clone(),
                tool_calls: t
                    .tool_calls
                    .iter()
                    .map(|c| ApiToolCall {
                        function: ApiFunction {
                            name: c.tool_name.clone(),
                            arguments: serde_json::Value::Object(c.arguments.clone()),
                        },
                    })
                    .collect(),
                tool_name: match t.role {
                    Role::Tool => t.tool_name.clone(),
                    _ => None,
                },
            })
            .collect()
    }

    fn to_api_tools(tools: &[ToolSpec]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.json_schema(),
                },
            })
            .collect()
    }

    fn to_response(api: ApiResponse) -> ProviderResponse {
        let calls: Vec<ToolInvocationRequest> = api
            .message
            .tool_calls
            .into_iter()
            .map(|tc| {
                ToolInvocationRequest::new(
                    mint_call_id(),
                    tc.function.name,
                    arguments_from_value(tc.function.arguments),
                )
            })
            .collect();

        let usage = match (api.prompt_eval_count, api.eval_count) {
            (None, None) => None,
            (p, c) => {
                let prompt_tokens = p.unwrap_or(0);
                let completion_tokens = c.unwrap_or(0);
                Some(Usage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens + completion_tokens,
                })
            }
        };

        ProviderResponse {
            turn: assistant_turn(Some(api.message.content), calls),
            usage,
            model: api.model,
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut options = serde_json::json!({
            "temperature": request.options.temperature,
        });
        if let Some(num_ctx) = request.options.context_window {
            options["num_ctx"] = serde_json::json!(num_ctx);
        }
        if let Some(max_tokens) = request.options.max_tokens {
            options["num_predict"] = serde_json::json!(max_tokens);
        }

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.turns),
            "stream": false,
            "options": options,
        });

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        debug!(provider = "ollama", model = %request.model, tools = request.tools.len(), "Sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;
        let response = check_status(response, &request.model).await?;

        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        Ok(Self::to_response(api))
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await.map_err(network_error)?;
        Ok(response.status().is_success())
    }
}

// --- Ollama API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    message: ApiMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsdesk_core::tool::{Arguments, ParamType, ParameterSpec};

    #[test]
    fn base_url_normalization() {
        let p = OllamaProvider::new(Some("http://gpu-box:11434/v1/"));
        assert_eq!(p.base_url, "http://gpu-box:11434");
        assert_eq!(OllamaProvider::new(None).base_url, DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn message_conversion_keeps_tool_context() {
        let mut args = Arguments::new();
        args.insert("symbol".into(), "NVDA".into());
        let call = ToolInvocationRequest::new("call_1", "stock_news", args);
        let turns = vec![
            Turn::system("sys"),
            Turn::user("NVDA news?"),
            Turn::tool_request("", vec![call.clone()]),
            Turn::tool_result(&call, "[]"),
        ];

        let api = OllamaProvider::to_api_messages(&turns);
        assert_eq!(api[0].role, "system");
        assert_eq!(api[2].tool_calls[0].function.name, "stock_news");
        assert_eq!(api[2].tool_calls[0].function.arguments["symbol"], "NVDA");
        assert_eq!(api[3].role, "tool");
        assert_eq!(api[3].tool_name.as_deref(), Some("stock_news"));
        assert!(api[1].tool_name.is_none());
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![
            ToolSpec::new("stock_news", "News for a ticker")
                .with_parameter("symbol", ParameterSpec::required(ParamType::String, "Ticker")),
        ];
        let api = OllamaProvider::to_api_tools(&tools);
        assert_eq!(api[0].r#type, "function");
        assert_eq!(api[0].function.parameters["required"][0], "symbol");
    }

    #[test]
    fn parse_tool_call_response() {
        let data = r#"{
            "model": "qwen2.5",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{"function": {"name": "stock_news", "arguments": {"symbol": "NVDA"}}}]
            },
            "done": true,
            "prompt_eval_count": 120,
            "eval_count": 12
        }"#;
        let api: ApiResponse = serde_json::from_str(data).unwrap();
        let response = OllamaProvider::to_response(api);

        assert!(response.turn.requests_tools());
        let call = &response.turn.tool_calls[0];
        assert_eq!(call.tool_name, "stock_news");
        assert_eq!(call.str_arg("symbol"), Some("NVDA"));
        assert!(call.id.starts_with("call_"));
        assert_eq!(response.usage.unwrap().total_tokens, 132);
    }

    #[test]
    fn parse_plain_response() {
        let data = r#"{"model":"qwen2.5","message":{"role":"assistant","content":"Hello!"},"done":true}"#;
        let api: ApiResponse = serde_json::from_str(data).unwrap();
        let response = OllamaProvider::to_response(api);
        assert_eq!(response.turn.role, Role::Assistant);
        assert_eq!(response.turn.content, "Hello!");
        assert!(response.usage.is_none());
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let p = OllamaProvider::new(Some("http://127.0.0.1:1"));
        let request = ProviderRequest {
            model: "qwen2.5".into(),
            turns: vec![Turn::system("sys"), Turn::user("hi")],
            tools: vec![],
            options: RequestOptions::default(),
        };
        let err = p.complete(request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_) | ProviderError::Timeout(_)));
    }
}
