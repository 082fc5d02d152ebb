//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::{CommandError, Result};
use crate::pipeline::AnswerReport;

/// How command results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name. Unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::OutputFormat`] if `value` cannot be serialized.
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> Result<String> {
        serde_json::to_string_pretty(value)
            .map_err(|e| CommandError::OutputFormat(format!("JSON serialization failed: {e}")).into())
    }
}

/// Renders an answered query.
///
/// Verbose text output adds the strategy, the context size and the passages
/// the answer cites.
///
/// # Errors
///
/// Returns [`CommandError::OutputFormat`] if JSON rendering fails.
pub fn format_answer_report(
    report: &AnswerReport,
    format: OutputFormat,
    verbose: bool,
) -> Result<String> {
    match format {
        OutputFormat::Json => format.to_json(report),
        OutputFormat::Text => {
            let mut output = report.answer.text.clone();
            if verbose {
                let _ = write!(
                    output,
                    "\n\n---\nStrategy: {} | Passages: {} | Context tokens: {}",
                    report.strategy,
                    report.passages.len(),
                    report.context_tokens
                );
                for passage in report.cited_passages() {
                    let _ = write!(
                        output,
                        "\n[{}] page {} chunk {}",
                        passage.source_id(),
                        passage.page(),
                        passage.chunk()
                    );
                }
            }
            output.push('\n');
            Ok(output)
        }
    }
}

/// Renders a plain tool answer.
///
/// # Errors
///
/// Returns [`CommandError::OutputFormat`] if JSON rendering fails.
pub fn format_tool_answer(tool: &str, answer: &str, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "tool": tool,
            "answer": answer,
        })),
        OutputFormat::Text => Ok(format!("{answer}\n")),
    }
}
