//! In-memory vector index over passages.

use tracing::debug;

use super::Embedder;
use crate::core::Passage;
use crate::error::ToolError;

/// Cosine similarity of two vectors. Zero when either is a zero vector or
/// the lengths differ.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Passages paired with their embeddings.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<(Passage, Vec<f32>)>,
}

impl VectorIndex {
    /// Embeds `passages` in one batch and indexes them.
    pub async fn build(passages: Vec<Passage>, embedder: &dyn Embedder) -> Result<Self, ToolError> {
        if passages.is_empty() {
            return Ok(Self::default());
        }

        let texts: Vec<String> = passages.iter().map(|p| p.content().to_string()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != passages.len() {
            return Err(ToolError::Embedding {
                message: format!(
                    "{} returned {} vectors for {} passages",
                    embedder.name(),
                    vectors.len(),
                    passages.len()
                ),
            });
        }

        debug!(embedder = embedder.name(), passages = passages.len(), "Built vector index");
        Ok(Self {
            entries: passages.into_iter().zip(vectors).collect(),
        })
    }

    /// Number of indexed passages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the `k` passages most similar to `query`, best first.
    ///
    /// Equal scores keep index order.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<Passage>, ToolError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = embedder.embed_one(query).await?;
        let mut scored: Vec<(f32, &Passage)> = self
            .entries
            .iter()
            .map(|(passage, vector)| (cosine_similarity(&query_vector, vector), passage))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored.into_iter().take(k).map(|(_, p)| p.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use async_trait::async_trait;

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        fn name(&self) -> &'static str {
            "short"
        }

        async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, ToolError> {
            Ok(vec![vec![1.0]])
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[1.0], &[1.0, 1.0]).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_search_returns_most_similar_first() {
        let embedder = HashEmbedder::default();
        let passages = vec![
            Passage::new("The cafeteria serves soup on Fridays", "menu", 1, 0),
            Passage::new("Annual revenue grew twelve percent", "report", 4, 0),
            Passage::new("Parking permits renew in March", "facilities", 2, 0),
        ];
        let index = VectorIndex::build(passages, &embedder)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(index.len(), 3);

        let hits = index
            .search("did annual revenue grow twelve percent", 2, &embedder)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source_id(), "report");
    }

    #[tokio::test]
    async fn test_k_larger_than_index() {
        let embedder = HashEmbedder::default();
        let index = VectorIndex::build(vec![Passage::new("only one", "a", 1, 0)], &embedder)
            .await
            .unwrap_or_else(|_| unreachable!());
        let hits = index
            .search("one", 10, &embedder)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_vector_count_mismatch_is_error() {
        let passages = vec![Passage::new("a", "a", 1, 0), Passage::new("b", "b", 1, 0)];
        let result = VectorIndex::build(passages, &ShortEmbedder).await;
        assert!(matches!(result, Err(ToolError::Embedding { .. })));
    }
}
