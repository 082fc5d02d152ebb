//! Tools answered by a function-calling agent inside a retry policy.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::Tool;
use super::retry::RetryPolicy;
use crate::agent::executor::FunctionBackend;
use crate::agent::prompt::build_question_prompt;
use crate::agent::provider::LlmProvider;
use crate::agent::traits::{Agent, execute_with_tools};
use crate::agent::worker::WorkerAgent;
use crate::error::ToolError;

/// A [`WorkerAgent`] bound to one [`FunctionBackend`].
///
/// Every agent failure (API error, loop limit, ...) is retried until the
/// policy is exhausted.
pub struct AgentTool {
    name: &'static str,
    description: String,
    provider: Arc<dyn LlmProvider>,
    backend: Arc<dyn FunctionBackend>,
    agent: WorkerAgent,
    retry: RetryPolicy,
    language: String,
}

impl AgentTool {
    /// Creates the tool. The agent is given every function `backend` serves.
    #[must_use]
    pub fn new(
        name: &'static str,
        description: impl Into<String>,
        provider: Arc<dyn LlmProvider>,
        backend: Arc<dyn FunctionBackend>,
        agent: WorkerAgent,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            name,
            description: description.into(),
            provider,
            backend,
            agent,
            retry,
            language: "English".to_string(),
        }
    }

    /// Sets the answer language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, query: &str) -> Result<String, ToolError> {
        let prompt = build_question_prompt(query, &self.language);
        let prompt = prompt.as_str();
        let agent = &self.agent;
        let provider = self.provider.as_ref();
        let backend = self.backend.as_ref();

        self.retry
            .run(self.name, move |attempt| async move {
                debug!(agent = agent.name(), attempt, "Running agent");
                let response = execute_with_tools(agent, provider, prompt, backend).await?;
                Ok(response.content)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
    use crate::agent::tool::ToolDefinition;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls, then answers.
    struct FlakyProvider {
        calls: AtomicUsize,
        failures: usize,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ToolError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(ToolError::ApiRequest {
                    message: format!("rate limited ({n})"),
                    status: Some(429),
                });
            }
            Ok(ChatResponse {
                content: format!("answer to {}", request.messages[1].content),
                usage: TokenUsage::default(),
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    struct EmptyBackend;

    #[async_trait]
    impl FunctionBackend for EmptyBackend {
        fn name(&self) -> &'static str {
            "empty"
        }
        fn definitions(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition::without_arguments("noop", "Does nothing.")]
        }
        async fn invoke(&self, _function: &str, _args: &str) -> Result<String, ToolError> {
            Ok("{}".to_string())
        }
    }

    fn tool(failures: usize, attempts: u32) -> (AgentTool, Arc<FlakyProvider>) {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            failures,
        });
        let backend: Arc<dyn FunctionBackend> = Arc::new(EmptyBackend);
        let agent = WorkerAgent::new(backend.as_ref(), "gpt-4".to_string(), 512, 5, "p".to_string());
        let tool = AgentTool::new(
            "@sqlsearch",
            "SQL",
            provider.clone(),
            backend,
            agent,
            RetryPolicy::new(attempts),
        );
        (tool, provider)
    }

    #[tokio::test]
    async fn test_recovers_within_policy() {
        let (tool, provider) = tool(1, 2);
        let answer = tool.run("how many orders?").await.unwrap_or_else(|_| unreachable!());
        assert!(answer.contains("how many orders?"));
        assert!(answer.contains("<language>English</language>"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let (tool, provider) = tool(10, 2);
        let err = tool.run("how many orders?").await.err().unwrap_or_else(|| unreachable!());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert!(err.user_message().contains("rate limited (1)"));
    }
}
