//! Text embeddings for the similarity-search fallback.
//!
//! The [`Embedder`] trait is the seam between [`ContextSelector`](crate::core::ContextSelector)
//! and whatever produces vectors. [`OpenAiEmbedder`] calls a hosted embeddings
//! endpoint; [`HashEmbedder`] is a deterministic, offline bag-of-words
//! embedder used when no embedding model is configured and in tests.

pub mod hash;
pub mod index;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::ToolError;

pub use hash::HashEmbedder;
pub use index::{VectorIndex, cosine_similarity};
pub use openai::OpenAiEmbedder;

/// Produces one vector per input text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embedder name for logging.
    fn name(&self) -> &'static str;

    /// Embeds a batch of texts. The output has the same length and order as
    /// `inputs`.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ToolError>;

    /// Embeds a single text.
    async fn embed_one(&self, input: &str) -> Result<Vec<f32>, ToolError> {
        self.embed(&[input.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ToolError::Embedding {
                message: format!("{} returned no vector", self.name()),
            })
    }
}

/// Embedder for `config`: hosted when an embedding model is set, local
/// otherwise.
#[must_use]
pub fn embedder_for(config: &LlmConfig) -> Arc<dyn Embedder> {
    match &config.embedding_model {
        Some(model) => Arc::new(OpenAiEmbedder::new(config, model.clone())),
        None => Arc::new(HashEmbedder::default()),
    }
}
