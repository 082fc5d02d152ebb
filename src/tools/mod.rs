//! User-facing tools, selected by a trigger term in the query.
//!
//! | Trigger       | Tool                          | Backend                         |
//! |---------------|-------------------------------|---------------------------------|
//! | `@docsearch`  | [`DocSearchTool`]             | search index + answer pipeline  |
//! | `@csvfile`    | [`AgentTool`] + [`TabularBackend`] | CSV file                   |
//! | `@sqlsearch`  | [`AgentTool`] + [`SqlBackend`]     | SQLite database            |
//! | `@bing`       | [`AgentTool`] + [`WebBackend`]     | web search API             |
//! | `@chatgpt`    | [`ChatTool`]                  | model knowledge only            |

pub mod agent_tool;
pub mod chat;
pub mod docsearch;
pub mod registry;
pub mod retry;
pub mod sql;
pub mod tabular;
pub mod web;

use async_trait::async_trait;

use crate::error::ToolError;

pub use agent_tool::AgentTool;
pub use chat::ChatTool;
pub use docsearch::DocSearchTool;
pub use registry::ToolRegistry;
pub use retry::RetryPolicy;
pub use sql::SqlBackend;
pub use tabular::TabularBackend;
pub use web::WebBackend;

/// Answer returned when the search index has nothing above the threshold.
pub const NO_RESULTS_MESSAGE: &str = "No Results Found in my knowledge base";

/// Trigger term of the search-index tool.
pub const DOCSEARCH: &str = "@docsearch";
/// Trigger term of the CSV tool.
pub const CSVFILE: &str = "@csvfile";
/// Trigger term of the SQL tool.
pub const SQLSEARCH: &str = "@sqlsearch";
/// Trigger term of the plain chat tool.
pub const CHATGPT: &str = "@chatgpt";
/// Trigger term of the web search tool.
pub const BING: &str = "@bing";

/// A question-answering capability.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Trigger term, e.g. `@docsearch`.
    fn name(&self) -> &str;

    /// When the tool should be used.
    fn description(&self) -> &str;

    /// Answers `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when a collaborator fails.
    async fn run(&self, query: &str) -> Result<String, ToolError>;
}
