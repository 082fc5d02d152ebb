//! Agent trait definition.
//!
//! Every LLM role in the system (answer combiner, passage extractor, plain
//! chat, tool workers) implements [`Agent`].

use async_trait::async_trait;

use super::executor::FunctionBackend;
use super::message::{ChatRequest, TokenUsage};
use super::provider::LlmProvider;
use super::tool::ToolDefinition;
use crate::error::ToolError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for the whole execution.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// An LLM role with a fixed system prompt and model settings.
///
/// Agents that call functions override [`Agent::tools`] and are run with
/// [`execute_with_tools`].
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Sampling temperature (0.0 = deterministic).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        1024
    }

    /// Function definitions available to this agent. Empty by default.
    fn tools(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    /// Maximum tool-calling loop iterations before aborting.
    fn max_tool_iterations(&self) -> usize {
        10
    }

    /// Builds the request for one user turn, without functions.
    fn request(&self, user_msg: &str) -> ChatRequest {
        let mut request = ChatRequest::new(self.model(), self.system_prompt(), user_msg);
        request.temperature = Some(self.temperature());
        request.max_tokens = Some(self.max_tokens());
        request
    }

    /// Executes the agent with the given user message (no functions).
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] on API failures.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, ToolError> {
        let response = provider.chat(&self.request(user_msg)).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}

/// Executes an agent with function-calling against `backend`.
///
/// Falls through to [`Agent::execute`] when the agent declares no functions.
///
/// # Errors
///
/// Returns [`ToolError`] on API failures or if the loop exceeds the agent's
/// max iterations.
pub async fn execute_with_tools(
    agent: &dyn Agent,
    provider: &dyn LlmProvider,
    user_msg: &str,
    backend: &dyn FunctionBackend,
) -> Result<AgentResponse, ToolError> {
    let tool_defs = agent.tools();

    if tool_defs.is_empty() {
        return agent.execute(provider, user_msg).await;
    }

    let mut request = agent.request(user_msg);
    request.tools = tool_defs;

    let response = super::agentic_loop::agentic_loop(
        provider,
        &mut request,
        backend,
        agent.max_tool_iterations(),
    )
    .await?;

    Ok(AgentResponse {
        content: response.content,
        usage: response.usage,
        finish_reason: response.finish_reason,
    })
}
