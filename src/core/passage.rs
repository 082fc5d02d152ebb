//! Passages and the text splitter that produces them from raw pages.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Target passage size in characters when splitting free text.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Separators tried in order, from paragraph breaks down to single graphemes.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ".", "!", "?", ",", " ", ""];

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap_or_else(|_| unreachable!()));

/// A unit of text eligible to be sent to the LLM.
///
/// Immutable once constructed. `source_id` is what the LLM cites back and what
/// [`render_answer`](super::citation::render_answer) turns into a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    content: String,
    source_id: String,
    page: usize,
    chunk: usize,
}

impl Passage {
    /// Creates a passage.
    pub fn new(
        content: impl Into<String>,
        source_id: impl Into<String>,
        page: usize,
        chunk: usize,
    ) -> Self {
        Self {
            content: content.into(),
            source_id: source_id.into(),
            page,
            chunk,
        }
    }

    /// Passage text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Citation identifier of the originating document.
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Page number within the source (1-based for split text).
    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Chunk index within the page.
    #[must_use]
    pub const fn chunk(&self) -> usize {
        self.chunk
    }

    /// Returns a copy with different content and the same provenance.
    #[must_use]
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }
}

/// Collapses runs of blank lines into a single paragraph break.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    BLANK_RUNS.replace_all(text, "\n\n").into_owned()
}

/// Splits raw pages into passages of at most [`DEFAULT_CHUNK_SIZE`] characters.
///
/// Pages are numbered from 1 and chunks from 0. Each passage's source id is
/// `"{page}-{chunk}"`, so answers over a local file cite page locations.
#[must_use]
pub fn passages_from_pages(pages: &[String]) -> Vec<Passage> {
    let mut passages = Vec::new();
    for (index, page) in pages.iter().enumerate() {
        let page_number = index + 1;
        let chunks = split_text(&normalize_text(page), DEFAULT_CHUNK_SIZE, DEFAULT_SEPARATORS);
        for (chunk, content) in chunks.into_iter().enumerate() {
            passages.push(Passage::new(
                content,
                format!("{page_number}-{chunk}"),
                page_number,
                chunk,
            ));
        }
    }
    passages
}

/// Recursively splits `text` into pieces of at most `chunk_size` characters.
///
/// The first separator present in the text is used; pieces that are still
/// too long are split again with the remaining separators. The empty
/// separator splits on grapheme clusters. Whitespace-only pieces are dropped.
#[must_use]
pub fn split_text(text: &str, chunk_size: usize, separators: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    split_into(text, chunk_size.max(1), separators, &mut out);
    out
}

fn split_into(text: &str, chunk_size: usize, separators: &[&str], out: &mut Vec<String>) {
    if text.chars().count() <= chunk_size {
        push_trimmed(text, out);
        return;
    }

    let Some(position) = separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep))
    else {
        push_trimmed(text, out);
        return;
    };
    let separator = separators[position];
    let remaining = &separators[position + 1..];

    let pieces: Vec<&str> = if separator.is_empty() {
        text.graphemes(true).collect()
    } else {
        text.split(separator).collect()
    };
    let separator_len = separator.chars().count();

    let mut current = String::new();
    let mut current_len = 0;
    for piece in pieces {
        let piece_len = piece.chars().count();

        if piece_len > chunk_size {
            push_trimmed(&current, out);
            current.clear();
            current_len = 0;
            if remaining.is_empty() {
                push_trimmed(piece, out);
            } else {
                split_into(piece, chunk_size, remaining, out);
            }
            continue;
        }

        let joined_len = if current.is_empty() {
            piece_len
        } else {
            current_len + separator_len + piece_len
        };
        if joined_len > chunk_size {
            push_trimmed(&current, out);
            current.clear();
            current_len = 0;
        }

        if !current.is_empty() {
            current.push_str(separator);
            current_len += separator_len;
        }
        current.push_str(piece);
        current_len += piece_len;
    }
    push_trimmed(&current, out);
}

fn push_trimmed(text: &str, out: &mut Vec<String>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}
