//! `@docsearch`: answers from the document search index.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{DOCSEARCH, NO_RESULTS_MESSAGE, Tool};
use crate::core::rank;
use crate::error::ToolError;
use crate::pipeline::AnswerPipeline;
use crate::search::SearchRetriever;

/// Retrieves, ranks and summarizes search index hits.
pub struct DocSearchTool {
    retriever: Arc<dyn SearchRetriever>,
    pipeline: AnswerPipeline,
    threshold: f64,
}

impl DocSearchTool {
    /// Creates the tool. Hits scoring at or below `threshold` are dropped.
    #[must_use]
    pub fn new(retriever: Arc<dyn SearchRetriever>, pipeline: AnswerPipeline, threshold: f64) -> Self {
        Self {
            retriever,
            pipeline,
            threshold,
        }
    }
}

#[async_trait]
impl Tool for DocSearchTool {
    fn name(&self) -> &str {
        DOCSEARCH
    }

    fn description(&self) -> &str {
        "Useful when the question includes the term @docsearch. Answers from the indexed document collection with citations."
    }

    async fn run(&self, query: &str) -> Result<String, ToolError> {
        let batches = self.retriever.search(query).await?;
        let raw: usize = batches.iter().map(Vec::len).sum();
        let ranked = rank(batches, self.threshold);
        debug!(raw, kept = ranked.len(), threshold = self.threshold, "Ranked search hits");

        if ranked.is_empty() {
            info!(query, "No hits above threshold");
            return Ok(NO_RESULTS_MESSAGE.to_string());
        }

        match self.pipeline.answer(query, ranked.into_passages()).await? {
            Some(report) => Ok(report.answer.text),
            None => Ok(NO_RESULTS_MESSAGE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::summarizer::Summarizer;
    use crate::core::{ContextSelector, ModelLimits, Passage, SearchHit, Strategy};
    use crate::embedding::HashEmbedder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedRetriever {
        batches: Vec<Vec<SearchHit>>,
    }

    #[async_trait]
    impl SearchRetriever for FixedRetriever {
        async fn search(&self, _query: &str) -> Result<Vec<Vec<SearchHit>>, ToolError> {
            Ok(self.batches.clone())
        }
    }

    struct FailingRetriever;

    #[async_trait]
    impl SearchRetriever for FailingRetriever {
        async fn search(&self, _query: &str) -> Result<Vec<Vec<SearchHit>>, ToolError> {
            Err(ToolError::ApiRequest {
                message: "503 Service Unavailable".to_string(),
                status: Some(503),
            })
        }
    }

    /// Echoes the first passage's source and counts calls.
    struct CountingSummarizer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Summarizer for CountingSummarizer {
        async fn generate(
            &self,
            passages: &[Passage],
            _query: &str,
            _language: &str,
            _strategy: Strategy,
        ) -> Result<String, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!(
                "Top source is {}",
                passages.first().map(Passage::source_id).unwrap_or_default()
            ))
        }
    }

    fn hit(id: &str, score: f64) -> SearchHit {
        SearchHit {
            id: id.to_string(),
            title: id.to_string(),
            chunks: vec![format!("text of {id}")],
            language: "en".to_string(),
            caption: None,
            score,
            name: format!("{id}.pdf"),
            location: format!("https://store/{id}.pdf"),
        }
    }

    fn tool(retriever: Arc<dyn SearchRetriever>, summarizer: Arc<CountingSummarizer>) -> DocSearchTool {
        let pipeline = AnswerPipeline::new(
            ContextSelector::new(ModelLimits::default()),
            Arc::new(HashEmbedder::default()),
            summarizer,
            "gpt-35-turbo",
        );
        DocSearchTool::new(retriever, pipeline, 1.0)
    }

    fn summarizer() -> Arc<CountingSummarizer> {
        Arc::new(CountingSummarizer {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_answers_from_highest_ranked_hit() {
        let retriever = Arc::new(FixedRetriever {
            batches: vec![vec![hit("a", 1.5), hit("b", 3.2)], vec![hit("c", 2.0)]],
        });
        let summarizer = summarizer();
        let answer = tool(retriever, summarizer.clone())
            .run("question")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(answer, "Top source is https://store/b.pdf");
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_everything_below_threshold_is_no_results() {
        let retriever = Arc::new(FixedRetriever {
            batches: vec![vec![hit("a", 0.4), hit("b", 1.0)]],
        });
        let summarizer = summarizer();
        let answer = tool(retriever, summarizer.clone())
            .run("question")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(answer, NO_RESULTS_MESSAGE);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retriever_failure_propagates() {
        let result = tool(Arc::new(FailingRetriever), summarizer()).run("question").await;
        assert!(matches!(result, Err(ToolError::ApiRequest { status: Some(503), .. })));
    }

    #[test]
    fn test_name_is_trigger() {
        let t = tool(Arc::new(FailingRetriever), summarizer());
        assert_eq!(t.name(), "@docsearch");
    }
}
