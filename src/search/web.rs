//! Web search client used by the `@bing` tool.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::WebSearchConfig;
use crate::error::ToolError;

/// One web page result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebResult {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub link: String,
    /// Text snippet around the match.
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct WebResponse {
    #[serde(default, rename = "webPages")]
    web_pages: Option<WebPages>,
}

#[derive(Debug, Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<WirePage>,
}

#[derive(Debug, Deserialize)]
struct WirePage {
    name: String,
    url: String,
    #[serde(default)]
    snippet: String,
}

/// Web search API client.
#[derive(Debug, Clone)]
pub struct WebSearchClient {
    http: Client,
    config: WebSearchConfig,
}

impl WebSearchClient {
    /// Creates a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ApiRequest`] if the HTTP client cannot be built.
    pub fn new(config: WebSearchConfig, timeout: Duration) -> Result<Self, ToolError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, config })
    }

    /// Default number of results per query.
    #[must_use]
    pub const fn top_k(&self) -> usize {
        self.config.top_k
    }

    /// Returns up to `count` results for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] on transport failures, non-success statuses or
    /// undecodable bodies.
    pub async fn search(&self, query: &str, count: usize) -> Result<Vec<WebResult>, ToolError> {
        let response = self
            .http
            .get(&self.config.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.config.api_key)
            .query(&[
                ("q", query.to_string()),
                ("count", count.to_string()),
                ("textDecorations", "true".to_string()),
                ("textFormat", "HTML".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ApiRequest {
                message: format!("web search returned {status}"),
                status: Some(status.as_u16()),
            });
        }

        let body = response.text().await?;
        let results = parse_results(&body, count)?;
        debug!(results = results.len(), "Web search complete");
        Ok(results)
    }
}

/// Decodes a web search body into at most `count` results.
///
/// A response without a `webPages` section has no results.
///
/// # Errors
///
/// Returns [`ToolError::MalformedResponse`] if the body is not JSON of the
/// expected shape.
pub fn parse_results(body: &str, count: usize) -> Result<Vec<WebResult>, ToolError> {
    let response: WebResponse =
        serde_json::from_str(body).map_err(|e| ToolError::MalformedResponse {
            source_name: "web search",
            message: e.to_string(),
        })?;

    Ok(response
        .web_pages
        .map(|pages| pages.value)
        .unwrap_or_default()
        .into_iter()
        .take(count)
        .map(|page| WebResult {
            title: page.name,
            link: page.url,
            snippet: page.snippet,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "_type": "SearchResponse",
        "webPages": {
            "totalEstimatedMatches": 1200,
            "value": [
                {"name": "Rust Blog", "url": "https://blog.rust-lang.org", "snippet": "Release notes"},
                {"name": "Docs", "url": "https://doc.rust-lang.org", "snippet": "The book"},
                {"name": "Crates", "url": "https://crates.io"}
            ]
        }
    }"#;

    #[test]
    fn test_parse_results() {
        let results = parse_results(BODY, 10).unwrap_or_else(|_| unreachable!());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Rust Blog");
        assert_eq!(results[0].link, "https://blog.rust-lang.org");
        assert_eq!(results[2].snippet, "");
    }

    #[test]
    fn test_parse_results_respects_count() {
        let results = parse_results(BODY, 2).unwrap_or_else(|_| unreachable!());
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_parse_results_without_pages() {
        let results = parse_results(r#"{"_type":"SearchResponse"}"#, 5).unwrap_or_else(|_| unreachable!());
        assert!(results.is_empty());
    }

    #[test]
    fn test_parse_results_malformed() {
        assert!(parse_results("not json", 5).is_err());
    }
}
