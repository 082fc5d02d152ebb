//! Question answering over a set of passages.
//!
//! [`AnswerPipeline`] chains the context selector, the summarizer and
//! citation rendering. It is shared by `@docsearch` (passages from the
//! search index) and the `ask-file` command (passages from a local file).

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::agent::prompt::PromptSet;
use crate::agent::provider::LlmProvider;
use crate::agent::summarizer::{LlmSummarizer, Summarizer};
use crate::config::Config;
use crate::core::{Answer, ContextSelector, Passage, Selection, Strategy, render_answer};
use crate::embedding::{Embedder, embedder_for};
use crate::error::ToolError;

/// Outcome of one answered query.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerReport {
    /// Final answer with rendered citations.
    pub answer: Answer,
    /// Strategy the summarizer used.
    pub strategy: Strategy,
    /// Estimated tokens of the passages sent to the model.
    pub context_tokens: usize,
    /// Passages sent to the model.
    pub passages: Vec<Passage>,
}

impl AnswerReport {
    /// Sent passages that the answer cites.
    #[must_use]
    pub fn cited_passages(&self) -> Vec<&Passage> {
        self.answer.cited_passages(&self.passages)
    }
}

/// Selects context, generates an answer and renders its citations.
pub struct AnswerPipeline {
    selector: ContextSelector,
    embedder: Arc<dyn Embedder>,
    summarizer: Arc<dyn Summarizer>,
    model: String,
    language: String,
    citation_token: Option<String>,
}

impl AnswerPipeline {
    /// Creates a pipeline answering in English without citation links.
    #[must_use]
    pub fn new(
        selector: ContextSelector,
        embedder: Arc<dyn Embedder>,
        summarizer: Arc<dyn Summarizer>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            selector,
            embedder,
            summarizer,
            model: model.into(),
            language: "English".to_string(),
            citation_token: None,
        }
    }

    /// Builds the pipeline described by `config`.
    #[must_use]
    pub fn from_config(config: &Config, provider: Arc<dyn LlmProvider>, prompts: &PromptSet) -> Self {
        let selector = ContextSelector::new(config.model_limits.clone())
            .with_similarity_k(config.similarity_k)
            .with_truncate_limit(config.chunks_limit);
        let summarizer = LlmSummarizer::new(
            provider,
            &config.llm.chat_model,
            config.llm.max_tokens,
            prompts,
        );

        let pipeline = Self::new(
            selector,
            embedder_for(&config.llm),
            Arc::new(summarizer),
            config.llm.chat_model.clone(),
        )
        .with_language(config.response_language.clone());

        match &config.citation_token {
            Some(token) => pipeline.with_citation_token(token.clone()),
            None => pipeline,
        }
    }

    /// Sets the answer language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Sets the access token appended to citation links.
    #[must_use]
    pub fn with_citation_token(mut self, token: impl Into<String>) -> Self {
        self.citation_token = Some(token.into());
        self
    }

    /// Replaces the model whose budget and name are used.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Model whose budget governs selection.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answers `query` from `passages`.
    ///
    /// Returns `Ok(None)` when there are no passages to answer from.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] if embedding or generation fails.
    pub async fn answer(
        &self,
        query: &str,
        passages: Vec<Passage>,
    ) -> Result<Option<AnswerReport>, ToolError> {
        let selection = self
            .selector
            .select(passages, query, &self.model, self.embedder.as_ref())
            .await?;

        let Selection::Selected {
            passages,
            strategy,
            total_tokens,
        } = selection
        else {
            return Ok(None);
        };

        let answer = self.assemble(&passages, query, strategy).await?;
        info!(
            model = self.model,
            strategy = %strategy,
            passages = passages.len(),
            context_tokens = total_tokens,
            citations = answer.citations.len(),
            "Answer assembled"
        );

        Ok(Some(AnswerReport {
            answer,
            strategy,
            context_tokens: total_tokens,
            passages,
        }))
    }

    /// Generates an answer with `strategy` and renders its citations.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] if generation fails. Citation handling itself
    /// never fails.
    pub async fn assemble(
        &self,
        passages: &[Passage],
        query: &str,
        strategy: Strategy,
    ) -> Result<Answer, ToolError> {
        let raw = self
            .summarizer
            .generate(passages, query, &self.language, strategy)
            .await?;
        Ok(render_answer(&raw, self.citation_token.as_deref()))
    }
}
