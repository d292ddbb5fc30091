//! Pieces shared by the HTTP providers.

use newsdesk_core::error::ProviderError;
use newsdesk_core::message::Turn;
use newsdesk_core::tool::{Arguments, ToolInvocationRequest};
use serde_json::Value;
use tracing::warn;

/// Map non-success HTTP statuses to provider errors.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();
    match status {
        200..=299 => Ok(response),
        429 => Err(ProviderError::RateLimited {
            retry_after_secs: 5,
        }),
        401 | 403 => Err(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        )),
        404 => Err(ProviderError::ModelNotFound(model.to_string())),
        _ => {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            })
        }
    }
}

pub(crate) fn network_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Tool-call arguments arrive as an object or as a JSON-encoded string.
/// Anything unparseable becomes an empty map; the registry reports what is missing.
pub(crate) fn arguments_from_value(value: Value) -> Arguments {
    match value {
        Value::Object(map) => map,
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Object(map)) => map,
            _ => {
                warn!(raw = %s, "Discarding unparseable tool arguments");
                Arguments::new()
            }
        },
        _ => Arguments::new(),
    }
}

pub(crate) fn mint_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

/// Normalize a reply into a single assistant turn.
pub(crate) fn assistant_turn(content: Option<String>, calls: Vec<ToolInvocationRequest>) -> Turn {
    let content = content.unwrap_or_default();
    if calls.is_empty() {
        Turn::assistant(content)
    } else {
        Turn::tool_request(content, calls)
    }
}
