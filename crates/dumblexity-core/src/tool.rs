use serde::{Deserialize, Serialize};

/// A request from the model to invoke a specific tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier for this call, unique within a turn.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON arguments to pass to the tool.
    pub arguments: serde_json::Value,
}

/// The result returned after executing a [`ToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The ID of the [`ToolCall`] this result corresponds to.
    pub call_id: String,
    /// The textual output produced by the tool, usually serialized JSON.
    pub content: String,
    /// Whether the tool execution ended in an error.
    pub is_error: bool,
}

impl ToolResult {
    /// Creates a successful tool result.
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Creates an error tool result.
    pub fn error(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}

/// A tool invocation the backend executed during a turn, with its reply.
///
/// The `response` payload is opaque here; its shape depends on `name` and is
/// interpreted by the citation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallRecord {
    /// Tool name as declared to the model.
    pub name: String,
    /// Arguments the model supplied.
    pub args: serde_json::Value,
    /// What the tool returned.
    pub response: serde_json::Value,
}

impl FunctionCallRecord {
    /// Records a finished call from its request and result.
    pub fn from_result(call: &ToolCall, result: &ToolResult) -> Self {
        Self {
            name: call.name.clone(),
            args: call.arguments.clone(),
            response: serde_json::Value::String(result.content.clone()),
        }
    }
}
