//! Answer generation over selected passages.
//!
//! [`LlmSummarizer`] runs one of two chains:
//!
//! - **stuff**: every passage goes into a single combine prompt.
//! - **map-reduce**: each passage is first reduced by the extract agent,
//!   then the extracts are combined. Extraction runs sequentially.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::prompt::{PromptSet, build_combine_prompt, build_extract_prompt};
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::core::{Passage, Strategy};
use crate::error::ToolError;

/// Agent that writes the final cited answer from passages.
pub struct CombineAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl CombineAgent {
    /// Creates a combine agent.
    #[must_use]
    pub const fn new(model: String, max_tokens: u32, system_prompt: String) -> Self {
        Self {
            model,
            max_tokens,
            system_prompt,
        }
    }
}

impl Agent for CombineAgent {
    fn name(&self) -> &'static str {
        "combine"
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
}

/// Agent that pulls the query-relevant text out of one passage.
pub struct ExtractAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl ExtractAgent {
    /// Creates an extract agent.
    #[must_use]
    pub const fn new(model: String, max_tokens: u32, system_prompt: String) -> Self {
        Self {
            model,
            max_tokens,
            system_prompt,
        }
    }
}

impl Agent for ExtractAgent {
    fn name(&self) -> &'static str {
        "extract"
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
}

/// Generates raw answer text (including any `SOURCES:` line) from passages.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Answers `query` in `language` from `passages` using `strategy`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the model call fails.
    async fn generate(
        &self,
        passages: &[Passage],
        query: &str,
        language: &str,
        strategy: Strategy,
    ) -> Result<String, ToolError>;
}

/// [`Summarizer`] backed by an [`LlmProvider`].
pub struct LlmSummarizer {
    provider: Arc<dyn LlmProvider>,
    combine: CombineAgent,
    extract: ExtractAgent,
}

impl LlmSummarizer {
    /// Creates a summarizer using `model` for both chain steps.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: &str,
        max_tokens: u32,
        prompts: &PromptSet,
    ) -> Self {
        Self {
            provider,
            combine: CombineAgent::new(model.to_string(), max_tokens, prompts.combine.clone()),
            extract: ExtractAgent::new(model.to_string(), max_tokens, prompts.extract.clone()),
        }
    }

    async fn combine(
        &self,
        passages: &[Passage],
        query: &str,
        language: &str,
    ) -> Result<String, ToolError> {
        let prompt = build_combine_prompt(query, language, passages);
        let response = self.combine.execute(self.provider.as_ref(), &prompt).await?;
        debug!(
            passages = passages.len(),
            total_tokens = response.usage.total_tokens,
            "Combined answer"
        );
        Ok(response.content)
    }

    async fn extract_all(&self, passages: &[Passage], query: &str) -> Result<Vec<Passage>, ToolError> {
        let mut extracts = Vec::with_capacity(passages.len());
        for passage in passages {
            let prompt = build_extract_prompt(query, passage);
            let response = self.extract.execute(self.provider.as_ref(), &prompt).await?;
            let text = response.content.trim();
            if text.is_empty() {
                debug!(source = passage.source_id(), "Passage had nothing relevant");
                continue;
            }
            extracts.push(passage.with_content(text));
        }
        Ok(extracts)
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn generate(
        &self,
        passages: &[Passage],
        query: &str,
        language: &str,
        strategy: Strategy,
    ) -> Result<String, ToolError> {
        match strategy {
            Strategy::DirectSummarize => self.combine(passages, query, language).await,
            Strategy::SplitAndSummarize => {
                let extracts = self.extract_all(passages, query).await?;
                debug!(
                    passages = passages.len(),
                    extracts = extracts.len(),
                    "Map step complete"
                );
                self.combine(&extracts, query, language).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
    use std::sync::Mutex;

    /// Replies to extract prompts with the passage's first word and to
    /// combine prompts with a fixed answer; records system prompts.
    struct ScriptedProvider {
        systems: Mutex<Vec<String>>,
        users: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self {
                systems: Mutex::new(Vec::new()),
                users: Mutex::new(Vec::new()),
            }
        }

        fn systems(&self) -> Vec<String> {
            self.systems.lock().map(|s| s.clone()).unwrap_or_default()
        }

        fn users(&self) -> Vec<String> {
            self.users.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ToolError> {
            let system = request.messages[0].content.clone();
            let user = request.messages[1].content.clone();
            let content = if system == "EXTRACT" {
                if user.contains("irrelevant") {
                    String::new()
                } else {
                    "extracted".to_string()
                }
            } else {
                "Answer. SOURCES: a.pdf".to_string()
            };
            if let Ok(mut s) = self.systems.lock() {
                s.push(system);
            }
            if let Ok(mut u) = self.users.lock() {
                u.push(user);
            }
            Ok(ChatResponse {
                content,
                usage: TokenUsage::default(),
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    fn prompts() -> PromptSet {
        let mut prompts = PromptSet::defaults();
        prompts.combine = "COMBINE".to_string();
        prompts.extract = "EXTRACT".to_string();
        prompts
    }

    fn passages() -> Vec<Passage> {
        vec![
            Passage::new("Revenue grew.", "a.pdf", 1, 0),
            Passage::new("irrelevant filler", "b.pdf", 2, 0),
            Passage::new("Margins held.", "c.pdf", 3, 0),
        ]
    }

    #[tokio::test]
    async fn test_stuff_makes_one_call() {
        let provider = Arc::new(ScriptedProvider::new());
        let summarizer = LlmSummarizer::new(provider.clone(), "gpt-35-turbo", 512, &prompts());

        let text = summarizer
            .generate(&passages(), "revenue?", "English", Strategy::DirectSummarize)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(text, "Answer. SOURCES: a.pdf");
        assert_eq!(provider.systems(), vec!["COMBINE"]);
        assert!(provider.users()[0].contains("Source: c.pdf"));
    }

    #[tokio::test]
    async fn test_map_reduce_extracts_then_combines() {
        let provider = Arc::new(ScriptedProvider::new());
        let summarizer = LlmSummarizer::new(provider.clone(), "gpt-35-turbo", 512, &prompts());

        let _ = summarizer
            .generate(&passages(), "revenue?", "English", Strategy::SplitAndSummarize)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(
            provider.systems(),
            vec!["EXTRACT", "EXTRACT", "EXTRACT", "COMBINE"]
        );
        let combine_input = &provider.users()[3];
        assert!(combine_input.contains("Content: extracted\nSource: a.pdf"));
        assert!(combine_input.contains("Source: c.pdf"));
        // Empty extracts are dropped before combining.
        assert!(!combine_input.contains("b.pdf"));
    }

    #[test]
    fn test_agent_properties() {
        let agent = CombineAgent::new("gpt-4".to_string(), 2048, "p".to_string());
        assert_eq!(agent.name(), "combine");
        assert_eq!(agent.model(), "gpt-4");
        assert_eq!(agent.max_tokens(), 2048);
        assert!(agent.tools().is_empty());
    }
}
