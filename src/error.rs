//! Error types for docsearch.
//!
//! [`ConfigError`] is raised once at startup while the [`Config`](crate::config::Config)
//! is validated. [`ToolError`] is raised per query by collaborators, agents and
//! tool adapters. Both fold into the crate-level [`Error`].

use thiserror::Error;

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error returned by the CLI layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be built.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A tool or collaborator failed while answering a query.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// A CLI command failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Filesystem errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Startup configuration errors.
///
/// Required fields are validated eagerly so a misconfigured deployment fails
/// before the first query, not during it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key for the LLM provider.
    #[error("no LLM API key configured (set OPENAI_API_KEY or DOCSEARCH_API_KEY)")]
    ApiKeyMissing,

    /// A section was partially configured and is missing a required field.
    #[error("{section} configuration is missing required field `{field}`")]
    MissingField {
        /// Configuration section (e.g. `search`).
        section: &'static str,
        /// Field that must be set.
        field: &'static str,
    },

    /// A field has a value that cannot be used.
    #[error("invalid value for `{field}`: {message}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}

/// Errors produced while answering a single query.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A hosted API call failed (LLM, embeddings, search, web search).
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error detail from the transport or API.
        message: String,
        /// HTTP status when one was received.
        status: Option<u16>,
    },

    /// The backend answered with a body that could not be decoded.
    #[error("malformed response from {source_name}: {message}")]
    MalformedResponse {
        /// Which collaborator produced the response.
        source_name: &'static str,
        /// Decoding error detail.
        message: String,
    },

    /// The provider name in configuration is not supported.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// Provider name as configured.
        name: String,
    },

    /// An embedding call returned an unusable result.
    #[error("embedding failed: {message}")]
    Embedding {
        /// Detail.
        message: String,
    },

    /// A function call requested by an agent failed.
    #[error("tool `{name}` failed: {message}")]
    ToolExecution {
        /// Function name.
        name: String,
        /// Failure detail.
        message: String,
    },

    /// An agent kept requesting function calls past its iteration limit.
    #[error("agent exceeded {max_iterations} tool-calling iterations without a final answer")]
    ToolLoopExceeded {
        /// Configured iteration limit.
        max_iterations: usize,
    },

    /// A retried operation failed on every attempt.
    #[error("{tool} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Tool name.
        tool: String,
        /// Number of attempts made.
        attempts: u32,
        /// Message of the final failure.
        last_error: String,
    },

    /// No registered tool could handle the query.
    #[error("no tool registered under `{name}`")]
    UnknownTool {
        /// Requested tool name.
        name: String,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite errors from the SQL backend.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem errors from file-backed tools.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Text shown to the end user when this error reaches the tool boundary.
    ///
    /// Retry exhaustion surfaces the last failure's message, matching how
    /// agent-backed tools report their final error as the answer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RetriesExhausted { last_error, .. } => last_error.clone(),
            Self::UnknownTool { name } => format!("No tool is available for `{name}`."),
            other => format!("Sorry, something went wrong while answering: {other}"),
        }
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        Self::ApiRequest {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<async_openai::error::OpenAIError> for ToolError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Self::ApiRequest {
            message: err.to_string(),
            status: None,
        }
    }
}

/// CLI command errors.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not run to completion.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be rendered in the requested format.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_exhausted_user_message_is_last_error() {
        let err = ToolError::RetriesExhausted {
            tool: "@sqlsearch".to_string(),
            attempts: 2,
            last_error: "no such table: orders".to_string(),
        };
        assert_eq!(err.user_message(), "no such table: orders");
        assert!(err.to_string().contains("after 2 attempts"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingField {
            section: "search",
            field: "api_key",
        };
        assert_eq!(
            err.to_string(),
            "search configuration is missing required field `api_key`"
        );
    }

    #[test]
    fn test_tool_error_wraps_into_error() {
        let err: Error = ToolError::ToolLoopExceeded { max_iterations: 3 }.into();
        assert!(matches!(err, Error::Tool(_)));
        assert!(err.to_string().contains("3 tool-calling iterations"));
    }
}
