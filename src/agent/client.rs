//! Provider factory.
//!
//! Maps provider names to concrete [`LlmProvider`] implementations.

use std::sync::Arc;

use crate::agent::provider::LlmProvider;
use crate::agent::providers::OpenAiProvider;
use crate::config::LlmConfig;
use crate::error::ToolError;

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default): OpenAI-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`ToolError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, ToolError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config)?)),
        other => Err(ToolError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}
