//! Function-calling agent for the CSV, SQL and web search tools.
//!
//! A [`WorkerAgent`] takes its function list from the backend it will be run
//! against, so one agent type serves every data source.

use super::executor::FunctionBackend;
use super::tool::ToolDefinition;
use super::traits::Agent;

/// Agent that answers by calling a backend's functions.
pub struct WorkerAgent {
    name: &'static str,
    model: String,
    max_tokens: u32,
    max_tool_iterations: usize,
    system_prompt: String,
    tools: Vec<ToolDefinition>,
}

impl WorkerAgent {
    /// Creates a worker exposing every function of `backend`.
    #[must_use]
    pub fn new(
        backend: &dyn FunctionBackend,
        model: String,
        max_tokens: u32,
        max_tool_iterations: usize,
        system_prompt: String,
    ) -> Self {
        Self {
            name: backend.name(),
            model,
            max_tokens,
            max_tool_iterations,
            system_prompt,
            tools: backend.definitions(),
        }
    }
}

impl Agent for WorkerAgent {
    fn name(&self) -> &'static str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        self.tools.clone()
    }

    fn max_tool_iterations(&self) -> usize {
        self.max_tool_iterations
    }
}
