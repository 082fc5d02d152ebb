//! HTTP client for a semantic-ranking document search service.
//!
//! Endpoint used:
//! - GET {endpoint}/indexes/{index}/docs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::SearchRetriever;
use crate::config::SearchConfig;
use crate::core::SearchHit;
use crate::error::ToolError;

/// Queries each configured index and decodes the hits.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: Client,
    config: SearchConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    value: Vec<WireHit>,
}

#[derive(Debug, Deserialize)]
struct WireCaption {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireHit {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default, rename = "pages")]
    chunks: Vec<String>,
    #[serde(default)]
    language: String,
    #[serde(default, rename = "@search.captions")]
    captions: Vec<WireCaption>,
    #[serde(default, rename = "@search.rerankerScore")]
    reranker_score: Option<f64>,
    #[serde(default, rename = "metadata_storage_name")]
    name: String,
    #[serde(default, rename = "metadata_storage_path")]
    location: String,
}

impl From<WireHit> for SearchHit {
    fn from(hit: WireHit) -> Self {
        Self {
            id: hit.id,
            title: hit.title,
            chunks: hit.chunks,
            language: hit.language,
            caption: hit.captions.into_iter().next().map(|c| c.text),
            // Unranked hits never pass a non-negative threshold.
            score: hit.reranker_score.unwrap_or(0.0),
            name: hit.name,
            location: hit.location,
        }
    }
}

impl SearchClient {
    /// Creates a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ApiRequest`] if the HTTP client cannot be built.
    pub fn new(config: SearchConfig, timeout: Duration) -> Result<Self, ToolError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, config })
    }

    fn url(&self, index: &str) -> String {
        format!("{}/indexes/{index}/docs", self.config.endpoint)
    }

    fn params(&self, query: &str) -> Vec<(&'static str, String)> {
        vec![
            ("api-version", self.config.api_version.clone()),
            ("search", query.to_string()),
            ("select", "*".to_string()),
            ("$top", self.config.top_k.to_string()),
            ("queryLanguage", self.config.query_language.clone()),
            ("queryType", "semantic".to_string()),
            ("semanticConfiguration", self.config.semantic_config.clone()),
            ("$count", "true".to_string()),
            ("speller", "lexicon".to_string()),
            ("answers", "extractive|count-3".to_string()),
            ("captions", "extractive|highlight-false".to_string()),
        ]
    }

    async fn search_index(&self, index: &str, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        let response = self
            .http
            .get(self.url(index))
            .header("api-key", &self.config.api_key)
            .query(&self.params(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::ApiRequest {
                message: format!("search index `{index}` returned {status}: {body}"),
                status: Some(status.as_u16()),
            });
        }

        let body = response.text().await?;
        let hits = parse_response(&body)?;
        debug!(index, hits = hits.len(), "Search index queried");
        Ok(hits)
    }
}

/// Decodes one index response body into hits.
///
/// # Errors
///
/// Returns [`ToolError::MalformedResponse`] if the body is not the expected
/// JSON shape.
pub fn parse_response(body: &str) -> Result<Vec<SearchHit>, ToolError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| ToolError::MalformedResponse {
            source_name: "search",
            message: e.to_string(),
        })?;
    Ok(response.value.into_iter().map(SearchHit::from).collect())
}

#[async_trait]
impl SearchRetriever for SearchClient {
    async fn search(&self, query: &str) -> Result<Vec<Vec<SearchHit>>, ToolError> {
        let mut batches = Vec::with_capacity(self.config.indexes.len());
        for index in &self.config.indexes {
            batches.push(self.search_index(index, query).await?);
        }
        Ok(batches)
    }
}
