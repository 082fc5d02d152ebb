//! Agentic tool-calling loop.
//!
//! Sends the request to the model, executes any function calls in the
//! response against a [`FunctionBackend`], appends the results, and repeats
//! until the model answers in text or the iteration limit is reached.

use tracing::debug;

use super::executor::{FunctionBackend, execute_call};
use super::message::{ChatRequest, ChatResponse, assistant_tool_calls_message, tool_message};
use super::provider::LlmProvider;
use crate::error::ToolError;

/// Runs model → function calls → results → model → … to a final answer.
///
/// `request` is extended in place with the assistant and function messages.
/// The returned response carries the usage of every round-trip combined.
///
/// # Errors
///
/// Returns [`ToolError::ToolLoopExceeded`] if the model keeps requesting
/// functions beyond `max_iterations`. Propagates provider errors.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    backend: &dyn FunctionBackend,
    max_iterations: usize,
) -> Result<ChatResponse, ToolError> {
    let mut usage = super::message::TokenUsage::default();

    for iteration in 0..max_iterations {
        let mut response = provider.chat(request).await?;
        usage.accumulate(response.usage);

        if response.tool_calls.is_empty() {
            debug!(iteration, backend = backend.name(), "Agentic loop completed");
            response.usage = usage;
            return Ok(response);
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "Executing tool calls"
        );

        request
            .messages
            .push(assistant_tool_calls_message(response.tool_calls.clone()));

        for call in &response.tool_calls {
            let result = execute_call(backend, call).await;
            debug!(
                tool = call.name,
                call_id = call.id,
                is_error = result.is_error,
                "Tool execution complete"
            );
            request
                .messages
                .push(tool_message(&result.tool_call_id, &result.content));
        }
    }

    Err(ToolError::ToolLoopExceeded { max_iterations })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, Role, TokenUsage};
    use crate::agent::tool::{ToolCall, ToolDefinition};

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    /// Returns function calls on the first N calls, then a final answer.
    struct MockToolProvider {
        call_count: AtomicUsize,
        tool_rounds: usize,
    }

    impl MockToolProvider {
        fn new(tool_rounds: usize) -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                tool_rounds,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockToolProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, ToolError> {
            let count = self.call_count.fetch_add(1, Ordering::SeqCst);
            let usage = TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 2,
                total_tokens: 12,
            };

            if count < self.tool_rounds {
                Ok(ChatResponse {
                    content: String::new(),
                    usage,
                    tool_calls: vec![ToolCall {
                        id: format!("call_{count}"),
                        name: "list_tables".to_string(),
                        arguments: "{}".to_string(),
                    }],
                    finish_reason: Some("tool_calls".to_string()),
                })
            } else {
                Ok(ChatResponse {
                    content: "There are two tables.".to_string(),
                    usage,
                    tool_calls: Vec::new(),
                    finish_reason: Some("stop".to_string()),
                })
            }
        }
    }

    struct TablesBackend;

    #[async_trait]
    impl FunctionBackend for TablesBackend {
        fn name(&self) -> &'static str {
            "tables"
        }

        fn definitions(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition::without_arguments("list_tables", "List tables.")]
        }

        async fn invoke(&self, _function: &str, _args: &str) -> Result<String, ToolError> {
            Ok(r#"["customers","orders"]"#.to_string())
        }
    }

    fn request() -> ChatRequest {
        ChatRequest::new("test", "You are a test agent.", "How many tables?")
    }

    #[tokio::test]
    async fn test_single_tool_round() {
        let provider = MockToolProvider::new(1);
        let mut request = request();

        let response = agentic_loop(&provider, &mut request, &TablesBackend, 10)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(response.content, "There are two tables.");
        // system + user + assistant(tool_calls) + tool(result)
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[3].role, Role::Tool);
        assert!(request.messages[3].content.contains("orders"));
        assert_eq!(response.usage.total_tokens, 24);
    }

    #[tokio::test]
    async fn test_multiple_rounds() {
        let provider = MockToolProvider::new(3);
        let mut request = request();

        let response = agentic_loop(&provider, &mut request, &TablesBackend, 10)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(response.content, "There are two tables.");
        assert_eq!(request.messages.len(), 8);
    }

    #[tokio::test]
    async fn test_exceeds_max() {
        let provider = MockToolProvider::new(100);
        let mut request = request();

        let result = agentic_loop(&provider, &mut request, &TablesBackend, 2).await;
        assert!(
            matches!(result, Err(ToolError::ToolLoopExceeded { max_iterations: 2 })),
            "Expected ToolLoopExceeded"
        );
    }

    #[tokio::test]
    async fn test_no_tools_needed() {
        let provider = MockToolProvider::new(0);
        let mut request = request();

        let response = agentic_loop(&provider, &mut request, &TablesBackend, 10)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(response.content, "There are two tables.");
        assert_eq!(request.messages.len(), 2);
    }
}
