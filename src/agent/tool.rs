//! Function-calling types.
//!
//! Backends describe their functions with [`ToolDefinition`]s; the model asks
//! for them with [`ToolCall`]s; the executor answers with [`ToolResult`]s.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// A function the model may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name (must match the backend's dispatch table).
    pub name: String,
    /// What the function does, written for the model.
    pub description: String,
    /// JSON Schema object describing the arguments.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Creates a definition with an explicit parameter schema.
    #[must_use]
    pub fn new(name: &str, description: &str, parameters: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// Creates a definition for a function that takes no arguments.
    #[must_use]
    pub fn without_arguments(name: &str, description: &str) -> Self {
        Self::new(
            name,
            description,
            json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        )
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id.
    pub id: String,
    /// Function to invoke.
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

/// Outcome of one function call, sent back to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Call this result answers.
    pub tool_call_id: String,
    /// JSON on success, error text on failure.
    pub content: String,
    /// Whether the call failed.
    pub is_error: bool,
}

impl ToolResult {
    /// A successful result.
    #[must_use]
    pub fn success(call: &ToolCall, content: String) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            content,
            is_error: false,
        }
    }

    /// A failed result. The model sees the message and may try again.
    #[must_use]
    pub fn failure(call: &ToolCall, message: String) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            content: message,
            is_error: true,
        }
    }
}
