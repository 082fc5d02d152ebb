//! Approximate token counting.
//!
//! The estimate is calibrated against the same model family as the budgets in
//! [`limits`](super::limits): roughly four characters per token for English
//! text under a BPE vocabulary. Counting Unicode scalar values rather than
//! bytes keeps non-ASCII text from being overestimated.

use super::passage::Passage;

/// Characters per estimated token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimates the token count of `text`.
///
/// Pure and deterministic. Empty text is zero tokens; any non-empty text is
/// at least one.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Sums [`estimate_tokens`] over the content of every passage.
#[must_use]
pub fn estimate_passages_tokens(passages: &[Passage]) -> usize {
    passages.iter().map(|p| estimate_tokens(p.content())).sum()
}
