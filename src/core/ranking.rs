//! Merging, filtering and ordering of search hits across indexes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::passage::Passage;

/// One document returned by the search backend.
///
/// Each entry of `chunks` becomes one [`Passage`] whose source id is
/// `location`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Unique document id across all indexes.
    pub id: String,
    /// Document title.
    pub title: String,
    /// Text chunks (pages) of the document.
    pub chunks: Vec<String>,
    /// Document language tag.
    pub language: String,
    /// First caption returned by semantic ranking, if any.
    pub caption: Option<String>,
    /// Relevance score assigned by the backend reranker.
    pub score: f64,
    /// Storage file name.
    pub name: String,
    /// Storage location; used as the citation target.
    pub location: String,
}

impl SearchHit {
    /// Expands the hit into one passage per chunk. `rank` is the hit's
    /// 1-based position in the ranked results and becomes each passage's page;
    /// the chunk index within the hit becomes its chunk.
    #[must_use]
    pub fn passages(&self, rank: usize) -> Vec<Passage> {
        self.chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| Passage::new(chunk.clone(), self.location.clone(), rank, i))
            .collect()
    }
}

/// Hits keyed by id, in descending score order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedResults {
    hits: Vec<SearchHit>,
}

impl RankedResults {
    /// Number of distinct documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// True when no hit passed the threshold.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Hits in ranked order.
    pub fn iter(&self) -> impl Iterator<Item = &SearchHit> {
        self.hits.iter()
    }

    /// Looks up a hit by document id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SearchHit> {
        self.hits.iter().find(|h| h.id == id)
    }

    /// Flattens every hit's chunks into passages, preserving rank order.
    #[must_use]
    pub fn into_passages(self) -> Vec<Passage> {
        self.hits
            .iter()
            .enumerate()
            .flat_map(|(i, hit)| hit.passages(i + 1))
            .collect()
    }

    /// Consumes the results, returning hits in ranked order.
    #[must_use]
    pub fn into_vec(self) -> Vec<SearchHit> {
        self.hits
    }
}

/// Merges per-index batches, drops hits at or below `threshold`, and orders
/// the rest by descending score.
///
/// A document id seen in more than one batch keeps the data of its last
/// occurrence. Ties keep first-insertion order, so the result is
/// deterministic for a given input order.
#[must_use]
pub fn rank<I>(batches: I, threshold: f64) -> RankedResults
where
    I: IntoIterator<Item = Vec<SearchHit>>,
{
    let mut hits: Vec<SearchHit> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for hit in batches.into_iter().flatten() {
        if let Some(&pos) = positions.get(&hit.id) {
            hits[pos] = hit;
        } else {
            positions.insert(hit.id.clone(), hits.len());
            hits.push(hit);
        }
    }

    hits.retain(|h| h.score > threshold);
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));

    RankedResults { hits }
}
