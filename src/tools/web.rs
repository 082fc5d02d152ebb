//! Web search functions for the `@bing` agent.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::agent::executor::{FunctionBackend, parse_args, to_json, unknown_function};
use crate::agent::tool::ToolDefinition;
use crate::error::ToolError;
use crate::search::WebSearchClient;

/// Upper bound on results per call, whatever the model asks for.
const MAX_RESULTS: usize = 20;

/// Exposes a [`WebSearchClient`] as the `web_search` function.
#[derive(Debug)]
pub struct WebBackend {
    client: WebSearchClient,
}

#[derive(Deserialize)]
struct WebSearchArgs {
    query: String,
    count: Option<usize>,
}

impl WebBackend {
    /// Wraps `client`.
    #[must_use]
    pub const fn new(client: WebSearchClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FunctionBackend for WebBackend {
    fn name(&self) -> &'static str {
        "web"
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition::new(
            "web_search",
            "Search the web. Returns a list of results with title, link and snippet.",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query"},
                    "count": {"type": "integer", "description": "Number of results (default 5, max 20)"}
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        )]
    }

    async fn invoke(&self, function: &str, args: &str) -> Result<String, ToolError> {
        match function {
            "web_search" => {
                let args: WebSearchArgs = parse_args(function, args)?;
                let count = args.count.unwrap_or(self.client.top_k()).clamp(1, MAX_RESULTS);
                let results = self.client.search(&args.query, count).await?;
                to_json(function, &results)
            }
            other => Err(unknown_function(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::time::Duration;

    fn backend() -> WebBackend {
        let config = Config::builder()
            .api_key("test")
            .web_api_key("bing-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let web = config.web.unwrap_or_else(|| unreachable!());
        WebBackend::new(WebSearchClient::new(web, Duration::from_secs(5)).unwrap_or_else(|_| unreachable!()))
    }

    #[test]
    fn test_definitions() {
        let defs = backend().definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "web_search");
    }

    #[tokio::test]
    async fn test_missing_query_is_rejected_before_request() {
        let result = backend().invoke("web_search", r#"{"count": 3}"#).await;
        assert!(matches!(result, Err(ToolError::ToolExecution { .. })));
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let result = backend().invoke("fetch_page", "{}").await;
        assert!(matches!(result, Err(ToolError::ToolExecution { .. })));
    }
}
