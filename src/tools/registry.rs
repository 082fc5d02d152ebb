//! Tool lookup and query routing.
//!
//! A query names its tool with a trigger term (`@docsearch what is ...`).
//! The registry finds the tool, strips the term, and runs it. [`ToolRegistry::answer`]
//! is the user boundary: errors become their user-facing message there.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::RegexBuilder;
use tracing::{error, info};

use super::retry::RetryPolicy;
use super::{
    AgentTool, BING, CSVFILE, ChatTool, DocSearchTool, SQLSEARCH, SqlBackend, TabularBackend, Tool,
    WebBackend,
};
use crate::agent::chat::ChatAgent;
use crate::agent::executor::FunctionBackend;
use crate::agent::prompt::PromptSet;
use crate::agent::provider::LlmProvider;
use crate::agent::worker::WorkerAgent;
use crate::config::Config;
use crate::error::ToolError;
use crate::pipeline::AnswerPipeline;
use crate::search::{SearchClient, WebSearchClient};

/// Tools keyed by trigger term.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
    default_tool: String,
}

impl ToolRegistry {
    /// An empty registry falling back to `default_tool`.
    #[must_use]
    pub fn new(default_tool: impl Into<String>) -> Self {
        Self {
            tools: BTreeMap::new(),
            default_tool: default_tool.into(),
        }
    }

    /// Registers `tool` under its name, replacing any previous tool.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_ascii_lowercase(), tool);
    }

    /// Looks up a tool by trigger term, case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(&name.to_ascii_lowercase()).map(AsRef::as_ref)
    }

    /// Registered tools, sorted by name.
    pub fn tools(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.values().map(AsRef::as_ref)
    }

    /// Registered trigger terms, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Picks the tool for `query` and the query text to pass it.
    ///
    /// The first registered trigger term found in the query (case-insensitive,
    /// earliest position wins) selects the tool and is removed from the text.
    /// Without a trigger term the default tool gets the query unchanged.
    #[must_use]
    pub fn route(&self, query: &str) -> (String, String) {
        let found = self
            .tools
            .keys()
            .filter_map(|name| {
                let re = RegexBuilder::new(&regex::escape(name))
                    .case_insensitive(true)
                    .build()
                    .ok()?;
                re.find(query).map(|m| (m.start(), name, re))
            })
            .min_by_key(|(start, _, _)| *start);

        match found {
            Some((_, name, re)) => {
                let stripped = re.replace_all(query, "");
                let stripped = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
                (name.clone(), stripped)
            }
            None => (self.default_tool.clone(), query.trim().to_string()),
        }
    }

    /// Routes and runs `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] if the routed tool is not
    /// registered, or the tool's own error.
    pub async fn dispatch(&self, query: &str) -> Result<String, ToolError> {
        let (name, text) = self.route(query);
        self.dispatch_to(&name, &text).await
    }

    /// Runs `query` on the named tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] if no tool has that name, or the
    /// tool's own error.
    pub async fn dispatch_to(&self, name: &str, query: &str) -> Result<String, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })?;
        info!(tool = tool.name(), "Dispatching query");
        tool.run(query).await
    }

    /// Answers `query`, never failing.
    ///
    /// Errors are logged and replaced by their user-facing message.
    pub async fn answer(&self, query: &str) -> String {
        match self.dispatch(query).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Tool failed");
                e.user_message()
            }
        }
    }

    /// Builds every tool `config` has a backend for. `@chatgpt` is always
    /// available.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] if a configured backend cannot be opened.
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn LlmProvider>,
        prompts: &PromptSet,
    ) -> Result<Self, ToolError> {
        let llm = &config.llm;
        let mut registry = Self::new(config.default_tool.clone());

        registry.register(Box::new(ChatTool::new(
            provider.clone(),
            ChatAgent::new(llm.chat_model.clone(), llm.max_tokens, prompts.chat.clone()),
        )));

        if let Some(search) = &config.search {
            let retriever = Arc::new(SearchClient::new(search.clone(), llm.timeout)?);
            let pipeline = AnswerPipeline::from_config(config, provider.clone(), prompts);
            registry.register(Box::new(DocSearchTool::new(
                retriever,
                pipeline,
                search.reranker_threshold,
            )));
        }

        let worker = |backend: Arc<dyn FunctionBackend>,
                      name: &'static str,
                      description: &str,
                      prompt: &str,
                      retry: RetryPolicy| {
            let agent = WorkerAgent::new(
                backend.as_ref(),
                llm.chat_model.clone(),
                llm.max_tokens,
                llm.max_tool_iterations,
                prompt.to_string(),
            );
            AgentTool::new(name, description, provider.clone(), backend, agent, retry)
                .with_language(config.response_language.clone())
        };

        if let Some(path) = &config.csv_path {
            let backend: Arc<dyn FunctionBackend> = Arc::new(TabularBackend::open(path)?);
            registry.register(Box::new(worker(
                backend,
                CSVFILE,
                "Useful when the question includes the term @csvfile. Answers from the configured CSV file.",
                &prompts.tabular,
                config.retry.tabular,
            )));
        }

        if let Some(path) = &config.sqlite_path {
            let backend: Arc<dyn FunctionBackend> = Arc::new(SqlBackend::open(path)?);
            registry.register(Box::new(worker(
                backend,
                SQLSEARCH,
                "Useful when the question includes the term @sqlsearch. Answers from the configured SQL database.",
                &prompts.sql,
                config.retry.sql,
            )));
        }

        if let Some(web) = &config.web {
            let backend: Arc<dyn FunctionBackend> =
                Arc::new(WebBackend::new(WebSearchClient::new(web.clone(), llm.timeout)?));
            registry.register(Box::new(worker(
                backend,
                BING,
                "Useful when the question includes the term @bing. Answers from a live web search.",
                &prompts.web,
                config.retry.web,
            )));
        }

        info!(tools = ?registry.names(), default_tool = registry.default_tool, "Tools registered");
        Ok(registry)
    }
}
