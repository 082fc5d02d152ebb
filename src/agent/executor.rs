//! Function dispatch for tool-calling agents.
//!
//! A [`FunctionBackend`] owns a data source (a CSV file, a SQLite database, a
//! web search client) and exposes it as named functions. [`execute_call`]
//! guards argument size and turns every outcome into a [`ToolResult`] the
//! model can read, so a bad call never aborts the loop.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::tool::{ToolCall, ToolDefinition, ToolResult};
use crate::error::ToolError;

/// Maximum raw byte length of function argument JSON from the model.
pub const MAX_TOOL_ARGS_LEN: usize = 100_000;
/// Maximum regex pattern length accepted from the model.
pub const MAX_REGEX_LEN: usize = 500;
/// Maximum compiled regex size (bytes).
pub const MAX_REGEX_DFA_SIZE: usize = 1_000_000;

/// A data source exposed to an agent as callable functions.
#[async_trait]
pub trait FunctionBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Functions this backend serves.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Runs one function with JSON-encoded `args`, returning JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ToolExecution`] for unknown functions, bad
    /// arguments, or failures in the underlying source.
    async fn invoke(&self, function: &str, args: &str) -> Result<String, ToolError>;
}

/// Executes one call against `backend`, never failing.
pub async fn execute_call(backend: &dyn FunctionBackend, call: &ToolCall) -> ToolResult {
    if call.arguments.len() > MAX_TOOL_ARGS_LEN {
        return ToolResult::failure(
            call,
            format!(
                "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                call.arguments.len()
            ),
        );
    }

    match backend.invoke(&call.name, &call.arguments).await {
        Ok(content) => ToolResult::success(call, content),
        Err(e) => {
            debug!(backend = backend.name(), function = %call.name, error = %e, "Function failed");
            ToolResult::failure(call, e.to_string())
        }
    }
}

/// Error for a function name the backend does not serve.
#[must_use]
pub fn unknown_function(name: &str) -> ToolError {
    ToolError::ToolExecution {
        name: name.to_string(),
        message: "unknown tool".to_string(),
    }
}

/// Parses function arguments, treating empty input as `{}`.
///
/// # Errors
///
/// Returns [`ToolError::ToolExecution`] describing the decode failure.
pub fn parse_args<T: DeserializeOwned>(function: &str, args: &str) -> Result<T, ToolError> {
    let args = if args.trim().is_empty() { "{}" } else { args };
    serde_json::from_str(args).map_err(|e| ToolError::ToolExecution {
        name: function.to_string(),
        message: format!("invalid arguments: {e}"),
    })
}

/// Serializes a function's result for the model.
///
/// # Errors
///
/// Returns [`ToolError::ToolExecution`] on serialization failure.
pub fn to_json<T: Serialize>(function: &str, value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| ToolError::ToolExecution {
        name: function.to_string(),
        message: format!("serialization error: {e}"),
    })
}

/// Compiles a model-supplied regex under length and size limits.
///
/// # Errors
///
/// Returns [`ToolError::ToolExecution`] if the pattern is too long or invalid.
pub fn compile_pattern(function: &str, pattern: &str) -> Result<Regex, ToolError> {
    if pattern.len() > MAX_REGEX_LEN {
        return Err(ToolError::ToolExecution {
            name: function.to_string(),
            message: format!(
                "regex pattern too long ({} bytes, max {MAX_REGEX_LEN})",
                pattern.len()
            ),
        });
    }
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(MAX_REGEX_DFA_SIZE)
        .build()
        .map_err(|e| ToolError::ToolExecution {
            name: function.to_string(),
            message: format!("invalid regex: {e}"),
        })
}
