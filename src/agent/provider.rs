//! Pluggable LLM provider trait.
//!
//! Implementations translate [`ChatRequest`]/[`ChatResponse`] into SDK calls,
//! keeping agents and tools independent of any one vendor.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::error::ToolError;

/// Chat completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] on API failures, timeouts, or parse errors.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ToolError>;
}
