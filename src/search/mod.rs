//! Retrieval from hosted search services.
//!
//! [`SearchRetriever`] is the seam between the `@docsearch` tool and the
//! document index; [`WebSearchClient`] backs the `@bing` tool's functions.

pub mod client;
pub mod web;

use async_trait::async_trait;

use crate::core::SearchHit;
use crate::error::ToolError;

pub use client::SearchClient;
pub use web::{WebResult, WebSearchClient};

/// Fetches raw hits for a query, one batch per index.
#[async_trait]
pub trait SearchRetriever: Send + Sync {
    /// Queries every configured index.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] on transport failures, non-success statuses or
    /// undecodable bodies.
    async fn search(&self, query: &str) -> Result<Vec<Vec<SearchHit>>, ToolError>;
}
