//! Core retrieval algorithms.
//!
//! Everything here is deterministic apart from the similarity fallback in
//! [`select`], which reaches out to an [`Embedder`](crate::embedding::Embedder).
//!
//! ```text
//! SearchHit batches ─► ranking::rank ─► RankedResults::into_passages
//!                                              │
//!             tokens::estimate + limits ───────┤
//!                                              ▼
//!                                   select::ContextSelector ─► Selection
//!                                              │
//!                                              ▼
//!                                 citation::render_answer ─► Answer
//! ```

pub mod citation;
pub mod limits;
pub mod passage;
pub mod ranking;
pub mod select;
pub mod tokens;

pub use citation::{Answer, render_answer, split_citations};
pub use limits::{DEFAULT_TOKEN_LIMIT, ModelLimits, limit_for};
pub use passage::{Passage, passages_from_pages};
pub use ranking::{RankedResults, SearchHit, rank};
pub use select::{ContextSelector, Selection, Strategy};
pub use tokens::{estimate_passages_tokens, estimate_tokens};
