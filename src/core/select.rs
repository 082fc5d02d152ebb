//! Budget-aware context selection.
//!
//! Decides whether the candidate passages fit the target model in one pass
//! and, when they do not, narrows them with a similarity search against the
//! query before picking a summarization [`Strategy`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::limits::ModelLimits;
use super::passage::Passage;
use super::tokens::estimate_passages_tokens;
use crate::embedding::{Embedder, VectorIndex};
use crate::error::ToolError;

/// Passages kept for the similarity fallback.
pub const DEFAULT_TRUNCATE_LIMIT: usize = 100;

/// Passages returned by the similarity fallback.
pub const DEFAULT_SIMILARITY_K: usize = 4;

/// How the selected passages are turned into an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// One combined prompt over every passage ("stuff").
    #[serde(rename = "stuff")]
    DirectSummarize,
    /// Summarize each passage, then combine the summaries.
    #[serde(rename = "map_reduce")]
    SplitAndSummarize,
}

impl Strategy {
    /// Wire name of the strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DirectSummarize => "stuff",
            Self::SplitAndSummarize => "map_reduce",
        }
    }

    const fn for_budget(total: usize, limit: usize) -> Self {
        if total > limit {
            Self::SplitAndSummarize
        } else {
            Self::DirectSummarize
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`ContextSelector::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// There was nothing to select from.
    NoResults,
    /// Passages to send to the summarizer.
    Selected {
        /// Chosen passages, in the order they should be presented.
        passages: Vec<Passage>,
        /// Summarization strategy for the chosen passages.
        strategy: Strategy,
        /// Estimated tokens of the chosen passages.
        total_tokens: usize,
    },
}

/// Chooses passages and a strategy under a model's token budget.
#[derive(Debug, Clone)]
pub struct ContextSelector {
    limits: ModelLimits,
    similarity_k: usize,
    truncate_limit: usize,
}

impl Default for ContextSelector {
    fn default() -> Self {
        Self::new(ModelLimits::default())
    }
}

impl ContextSelector {
    /// Creates a selector with the default `similarity_k` and
    /// `truncate_limit`.
    #[must_use]
    pub fn new(limits: ModelLimits) -> Self {
        Self {
            limits,
            similarity_k: DEFAULT_SIMILARITY_K,
            truncate_limit: DEFAULT_TRUNCATE_LIMIT,
        }
    }

    /// Sets how many passages the similarity fallback returns.
    #[must_use]
    pub fn with_similarity_k(mut self, k: usize) -> Self {
        self.similarity_k = k;
        self
    }

    /// Sets how many passages are indexed by the similarity fallback.
    #[must_use]
    pub fn with_truncate_limit(mut self, limit: usize) -> Self {
        self.truncate_limit = limit;
        self
    }

    /// Model budget table in use.
    #[must_use]
    pub const fn limits(&self) -> &ModelLimits {
        &self.limits
    }

    /// Selects passages for `query` against `model`'s budget.
    ///
    /// Passages that fit are returned unchanged with
    /// [`Strategy::DirectSummarize`]. Otherwise the first `truncate_limit`
    /// passages are indexed, the `similarity_k` nearest to the query are
    /// kept, and the strategy is decided from that reduced set alone.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] if embedding fails during the fallback.
    pub async fn select(
        &self,
        passages: Vec<Passage>,
        query: &str,
        model: &str,
        embedder: &dyn Embedder,
    ) -> Result<Selection, ToolError> {
        if passages.is_empty() {
            return Ok(Selection::NoResults);
        }

        let limit = self.limits.limit_for(model);
        let total = estimate_passages_tokens(&passages);

        if total <= limit {
            debug!(model, total, limit, count = passages.len(), "Passages fit budget");
            return Ok(Selection::Selected {
                passages,
                strategy: Strategy::DirectSummarize,
                total_tokens: total,
            });
        }

        let original_count = passages.len();
        let truncated: Vec<Passage> = passages.into_iter().take(self.truncate_limit).collect();
        let index = VectorIndex::build(truncated, embedder).await?;
        let reduced = index.search(query, self.similarity_k, embedder).await?;

        let reduced_total = estimate_passages_tokens(&reduced);
        let strategy = Strategy::for_budget(reduced_total, limit);

        info!(
            model,
            total,
            limit,
            original_count,
            indexed = index.len(),
            kept = reduced.len(),
            reduced_total,
            strategy = %strategy,
            "Narrowed passages by similarity"
        );

        Ok(Selection::Selected {
            passages: reduced,
            strategy,
            total_tokens: reduced_total,
        })
    }
}
