//! `@chatgpt`: one completion from the model's own knowledge.

use std::sync::Arc;

use async_trait::async_trait;

use super::{CHATGPT, Tool};
use crate::agent::chat::ChatAgent;
use crate::agent::provider::LlmProvider;
use crate::agent::traits::Agent;
use crate::error::ToolError;

/// Plain chat tool. Not retried.
pub struct ChatTool {
    provider: Arc<dyn LlmProvider>,
    agent: ChatAgent,
}

impl ChatTool {
    /// Creates the tool.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, agent: ChatAgent) -> Self {
        Self { provider, agent }
    }
}

#[async_trait]
impl Tool for ChatTool {
    fn name(&self) -> &str {
        CHATGPT
    }

    fn description(&self) -> &str {
        "Useful when the question includes the term @chatgpt, or names no other tool. Answers from general knowledge."
    }

    async fn run(&self, query: &str) -> Result<String, ToolError> {
        let response = self.agent.execute(self.provider.as_ref(), query).await?;
        Ok(response.content)
    }
}
