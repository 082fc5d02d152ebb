//! Provider-agnostic chat types.
//!
//! Agents and tools build these; only the provider implementation knows the
//! SDK's wire types.

use serde::{Deserialize, Serialize};

use super::tool::{ToolCall, ToolDefinition};

/// Role of a chat message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
    /// Function result.
    Tool,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Message content.
    pub content: String,
    /// Function calls requested by the assistant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Call this message answers (only for `Role::Tool`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model or deployment name.
    pub model: String,
    /// Ordered conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Functions the model may call.
    pub tools: Vec<ToolDefinition>,
}

impl ChatRequest {
    /// A two-message request: system instructions and one user turn.
    #[must_use]
    pub fn new(model: &str, system: &str, user: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![system_message(system), user_message(user)],
            temperature: None,
            max_tokens: None,
            tools: Vec::new(),
        }
    }
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub prompt_tokens: u32,
    /// Completion tokens.
    pub completion_tokens: u32,
    /// Total tokens.
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Adds another call's usage to this one.
    pub const fn accumulate(&mut self, other: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// A chat completion response.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    /// Generated text.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Function calls requested by the model.
    pub tool_calls: Vec<ToolCall>,
    /// Finish reason (e.g., `"stop"`, `"tool_calls"`).
    pub finish_reason: Option<String>,
}

/// Creates a system message.
#[must_use]
pub fn system_message(content: &str) -> ChatMessage {
    ChatMessage::text(Role::System, content)
}

/// Creates a user message.
#[must_use]
pub fn user_message(content: &str) -> ChatMessage {
    ChatMessage::text(Role::User, content)
}

/// Creates an assistant message carrying function calls and no text.
#[must_use]
pub const fn assistant_tool_calls_message(tool_calls: Vec<ToolCall>) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content: String::new(),
        tool_calls,
        tool_call_id: None,
    }
}

/// Creates a function result message.
#[must_use]
pub fn tool_message(tool_call_id: &str, content: &str) -> ChatMessage {
    ChatMessage {
        tool_call_id: Some(tool_call_id.to_string()),
        ..ChatMessage::text(Role::Tool, content)
    }
}
