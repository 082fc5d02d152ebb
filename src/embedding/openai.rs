//! Hosted embeddings through an `OpenAI`-compatible endpoint.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::CreateEmbeddingRequestArgs;
use async_trait::async_trait;
use tracing::debug;

use super::Embedder;
use crate::config::LlmConfig;
use crate::error::ToolError;

/// Inputs per embeddings request. Some deployments cap batch size.
const EMBEDDING_BATCH_SIZE: usize = 16;

/// Embedder backed by the embeddings API.
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEmbedder {
    /// Creates an embedder sharing the LLM credentials.
    #[must_use]
    pub fn new(config: &LlmConfig, model: impl Into<String>) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }
        Self {
            client: Client::with_config(openai_config),
            model: model.into(),
        }
    }

    /// Embedding model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ToolError> {
        let mut vectors = Vec::with_capacity(inputs.len());

        for batch in inputs.chunks(EMBEDDING_BATCH_SIZE) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(batch.to_vec())
                .build()?;
            let mut response = self.client.embeddings().create(request).await?;
            if response.data.len() != batch.len() {
                return Err(ToolError::MalformedResponse {
                    source_name: "embeddings",
                    message: format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        response.data.len()
                    ),
                });
            }
            response.data.sort_by_key(|e| e.index);
            vectors.extend(response.data.into_iter().map(|e| e.embedding));
        }

        debug!(model = %self.model, count = vectors.len(), "Embedded inputs");
        Ok(vectors)
    }
}
