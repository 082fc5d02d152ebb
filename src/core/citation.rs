//! Citation extraction and footnote rendering for generated answers.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::passage::Passage;

/// Matches the marker separating the answer body from its source list.
static SOURCES_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsources?\b:?\W*").unwrap_or_else(|_| unreachable!()));

/// A generated answer with its cited sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    /// Answer text, with rendered citation links when available.
    pub text: String,
    /// Source ids cited by the model, in the order given.
    pub citations: Vec<String>,
}

impl Answer {
    /// An answer without citations.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }

    /// Passages whose source id was cited, in passage order.
    #[must_use]
    pub fn cited_passages<'a>(&self, passages: &'a [Passage]) -> Vec<&'a Passage> {
        passages
            .iter()
            .filter(|p| self.citations.iter().any(|c| c == p.source_id()))
            .collect()
    }
}

/// Splits generated text at the first sources marker.
///
/// Returns the body (trailing whitespace removed) and the cited ids with all
/// whitespace stripped. `None` when no marker is present.
#[must_use]
pub fn split_citations(raw: &str) -> Option<(&str, Vec<String>)> {
    let marker = SOURCES_MARKER.find(raw)?;
    let body = raw[..marker.start()].trim_end();
    let citations = raw[marker.end()..]
        .split(',')
        .map(|c| c.chars().filter(|ch| !ch.is_whitespace()).collect::<String>())
        .filter(|c| !c.is_empty())
        .collect();
    Some((body, citations))
}

/// Renders the footnote block for `citations`, each linked to
/// `<citation><access_token>`.
fn render_links(citations: &[String], access_token: &str) -> String {
    let links: String = citations
        .iter()
        .enumerate()
        .map(|(i, c)| format!("<sup><a href=\"{c}{access_token}\">[{}]</a></sup>", i + 1))
        .collect();
    format!("<br><u>Sources</u>: {links}")
}

/// Post-processes raw generated text into an [`Answer`].
///
/// Without a sources marker the text is returned unchanged. With a marker
/// but no access token, or with an empty source list, the body is returned
/// without links. Never fails.
#[must_use]
pub fn render_answer(raw: &str, access_token: Option<&str>) -> Answer {
    let Some((body, citations)) = split_citations(raw) else {
        return Answer::plain(raw);
    };

    let text = match access_token {
        Some(token) if !citations.is_empty() => {
            format!("{body}{}", render_links(&citations, token))
        }
        _ => body.to_string(),
    };

    Answer { text, citations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const TOKEN: &str = "?sv=2024&sig=abc";

    #[test]
    fn test_scenario_two_sources() {
        let answer = render_answer("The answer is X. SOURCES: a-1, b-2", Some(TOKEN));
        assert_eq!(answer.citations, vec!["a-1", "b-2"]);
        assert_eq!(
            answer.text,
            "The answer is X.<br><u>Sources</u>: \
             <sup><a href=\"a-1?sv=2024&sig=abc\">[1]</a></sup>\
             <sup><a href=\"b-2?sv=2024&sig=abc\">[2]</a></sup>"
        );
    }

    #[test_case("The answer is X. SOURCES: a-1, b-2" ; "upper plural")]
    #[test_case("The answer is X.\nSource: a-1,b-2" ; "singular with newline")]
    #[test_case("The answer is X. sources - a-1 , b-2" ; "dash separator")]
    #[test_case("The answer is X. Sources: [a-1, b-2" ; "bracket consumed")]
    fn test_marker_variants(raw: &str) {
        let (body, citations) = split_citations(raw).unwrap_or_else(|| unreachable!());
        assert_eq!(body, "The answer is X.");
        assert_eq!(citations, vec!["a-1", "b-2"]);
    }

    #[test]
    fn test_no_marker_is_unchanged() {
        let raw = "Revenue grew 12% year over year.  ";
        let answer = render_answer(raw, Some(TOKEN));
        assert_eq!(answer.text, raw);
        assert!(answer.citations.is_empty());
    }

    #[test]
    fn test_marker_inside_word_is_ignored() {
        assert!(split_citations("Resourceful teams outsource little.").is_none());
    }

    #[test]
    fn test_missing_token_drops_links() {
        let answer = render_answer("Body text. Sources: doc.pdf", None);
        assert_eq!(answer.text, "Body text.");
        assert_eq!(answer.citations, vec!["doc.pdf"]);
    }

    #[test]
    fn test_empty_source_list_returns_body() {
        let answer = render_answer("Nothing relevant was found. SOURCES:", Some(TOKEN));
        assert_eq!(answer.text, "Nothing relevant was found.");
        assert!(answer.citations.is_empty());
    }

    #[test]
    fn test_cited_passages_lookup() {
        let passages = vec![
            Passage::new("first", "a-1", 1, 0),
            Passage::new("second", "b-2", 2, 0),
            Passage::new("third", "c-3", 3, 0),
        ];
        let answer = render_answer("X. SOURCES: c-3, a-1, z-9", Some(TOKEN));
        let cited: Vec<&str> = answer
            .cited_passages(&passages)
            .into_iter()
            .map(Passage::content)
            .collect();
        assert_eq!(cited, vec!["first", "third"]);
    }

    #[test]
    fn test_whitespace_inside_ids_is_removed() {
        let (_, citations) =
            split_citations("Body. SOURCES: https://store/my file.pdf, 2 - 0").unwrap_or_default();
        assert_eq!(citations, vec!["https://store/myfile.pdf", "2-0"]);
    }
}
