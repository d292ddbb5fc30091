//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what give the assistant access to external data:
//! scrape stock news, read market headlines, search the web, etc.
//!
//! Each tool declares a [`ToolSpec`] once, at registration. The registry
//! validates invocation arguments against that spec before dispatching, and
//! every failure comes back as a tagged [`ToolResult`] instead of an error so
//! the language model can read it and recover.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{RegistryError, ToolError};

/// Invocation arguments: parameter name → JSON value.
pub type Arguments = serde_json::Map<String, Value>;

/// JSON type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }
}

/// Declaration of a single tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            param_type,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            param_type,
            description: description.into(),
            required: false,
        }
    }
}

/// A tool's name, description and argument schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name
    pub name: String,

    /// What the tool does (sent to the LLM)
    pub description: String,

    /// Parameter name → declaration
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.insert(name.into(), spec);
        self
    }

    /// Structural checks run once at registration.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let malformed = |reason: &str| RegistryError::MalformedSpec {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(malformed("name is empty"));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(malformed("name may only contain [A-Za-z0-9_-]"));
        }
        if self.description.trim().is_empty() {
            return Err(malformed("description is empty"));
        }
        if self.parameters.keys().any(|k| k.trim().is_empty()) {
            return Err(malformed("parameter with an empty name"));
        }
        Ok(())
    }

    /// Check invocation arguments against the declared parameters.
    ///
    /// Extra arguments are ignored. Missing, null or blank required
    /// arguments and type mismatches are reported as
    /// [`ToolError::InvalidArguments`].
    pub fn check_arguments(&self, arguments: &Arguments) -> Result<(), ToolError> {
        for (param, spec) in &self.parameters {
            let value = arguments.get(param).filter(|v| !v.is_null());
            match value {
                None if spec.required => {
                    return Err(ToolError::InvalidArguments(format!(
                        "missing required argument '{param}' for tool '{}'",
                        self.name
                    )));
                }
                None => {}
                Some(v) if !spec.param_type.accepts(v) => {
                    return Err(ToolError::InvalidArguments(format!(
                        "argument '{param}' for tool '{}' must be a {}",
                        self.name,
                        spec.param_type.as_str()
                    )));
                }
                Some(Value::String(s)) if spec.required && s.trim().is_empty() => {
                    return Err(ToolError::InvalidArguments(format!(
                        "argument '{param}' for tool '{}' must not be blank",
                        self.name
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// JSON Schema describing this tool's parameters.
    pub fn json_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .parameters
            .iter()
            .map(|(name, p)| {
                (
                    name.clone(),
                    serde_json::json!({
                        "type": p.param_type.as_str(),
                        "description": p.description,
                    }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|(_, p)| p.required)
            .map(|(name, _)| name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A request from the model to run a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Call ID (the provider's, or one we minted when it had none)
    pub id: String,

    /// Name of the tool to invoke
    pub tool_name: String,

    /// Arguments as a JSON object
    #[serde(default)]
    pub arguments: Arguments,
}

impl ToolInvocationRequest {
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// Fetch a string argument.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Outcome tag for a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    NotFound,
    NotOffered,
    InvalidArguments,
    Failed,
}

impl From<&ToolError> for ToolStatus {
    fn from(err: &ToolError) -> Self {
        match err {
            ToolError::NotFound(_) => ToolStatus::NotFound,
            ToolError::NotOffered(_) => ToolStatus::NotOffered,
            ToolError::InvalidArguments(_) => ToolStatus::InvalidArguments,
            ToolError::ExecutionFailed { .. }
            | ToolError::Timeout { .. }
            | ToolError::Cancelled(_) => ToolStatus::Failed,
        }
    }
}

/// What a tool hands back on success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Text shown to the model
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolOutput {
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            data: None,
        }
    }

    /// Serialize `data` as pretty JSON for the model and keep it as structured data.
    pub fn json<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(data)?;
        Ok(Self {
            output: serde_json::to_string_pretty(&value)?,
            data: Some(value),
        })
    }
}

/// The result of a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// The tool that was asked for
    pub tool_name: String,

    /// Outcome tag
    pub status: ToolStatus,

    /// The output content (or the error message)
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResult {
    pub fn success(request: &ToolInvocationRequest, output: ToolOutput) -> Self {
        Self {
            call_id: request.id.clone(),
            tool_name: request.tool_name.clone(),
            status: ToolStatus::Ok,
            output: output.output,
            data: output.data,
        }
    }

    pub fn failure(request: &ToolInvocationRequest, error: &ToolError) -> Self {
        Self {
            call_id: request.id.clone(),
            tool_name: request.tool_name.clone(),
            status: ToolStatus::from(error),
            output: error.to_string(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Ok
    }

    /// Text for the tool turn; failures are prefixed so the model can tell.
    pub fn turn_content(&self) -> String {
        if self.is_success() {
            self.output.clone()
        } else {
            format!("Error: {}", self.output)
        }
    }
}

/// The core Tool trait.
///
/// Each tool (stock_news, market_news, web_search) implements this trait.
/// Network calls and file writes happen inside `execute`; the registry
/// only dispatches.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's declaration. Captured once at registration.
    fn spec(&self) -> ToolSpec;

    /// Execute the tool with arguments that already passed schema checks.
    async fn execute(&self, arguments: Arguments) -> Result<ToolOutput, ToolError>;
}

struct RegisteredTool {
    spec: ToolSpec,
    tool: Box<dyn Tool>,
}

/// A fixed set of named tools.
///
/// The agent loop uses this to:
/// 1. Get tool specs to offer to the LLM
/// 2. Validate and dispatch invocations the LLM asks for
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Duplicate names and malformed specs are rejected.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), RegistryError> {
        let spec = tool.spec();
        spec.validate()?;
        if self.index.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateName(spec.name));
        }
        self.index.insert(spec.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool { spec, tool });
        Ok(())
    }

    /// Get a tool's spec by name.
    pub fn spec(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.tools[i].spec)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All specs, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec.clone()).collect()
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.spec.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate and dispatch one invocation. Never fails; problems are
    /// reported through the result's status.
    pub async fn invoke(&self, request: &ToolInvocationRequest) -> ToolResult {
        let Some(&i) = self.index.get(&request.tool_name) else {
            warn!(tool = %request.tool_name, "Model requested an unknown tool");
            return ToolResult::failure(request, &ToolError::NotFound(request.tool_name.clone()));
        };
        let entry = &self.tools[i];

        if let Err(e) = entry.spec.check_arguments(&request.arguments) {
            debug!(tool = %request.tool_name, error = %e, "Rejected tool arguments");
            return ToolResult::failure(request, &e);
        }

        match entry.tool.execute(request.arguments.clone()).await {
            Ok(output) => ToolResult::success(request, output),
            Err(e) => {
                warn!(tool = %request.tool_name, error = %e, "Tool execution failed");
                ToolResult::failure(request, &e)
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
