//! CSV functions for the `@csvfile` agent.
//!
//! The file is loaded once into memory; rows are presented to the model as
//! JSON objects keyed by column name.

use std::path::Path;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::agent::executor::{FunctionBackend, compile_pattern, parse_args, to_json, unknown_function};
use crate::agent::tool::ToolDefinition;
use crate::error::ToolError;

/// Default rows per `csv_rows` page.
const DEFAULT_PAGE: usize = 20;
/// Maximum rows returned by one call.
const MAX_PAGE: usize = 100;
/// Rows included with the schema as a sample.
const SAMPLE_ROWS: usize = 3;

/// In-memory CSV table exposed as functions.
#[derive(Debug, Clone)]
pub struct TabularBackend {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct RowsArgs {
    #[serde(default)]
    offset: usize,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct GrepArgs {
    pattern: String,
    column: Option<String>,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct StatsArgs {
    column: String,
    pattern: Option<String>,
    filter_column: Option<String>,
}

#[derive(Debug, Serialize)]
struct Schema {
    columns: Vec<String>,
    row_count: usize,
    sample: Vec<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
struct Matches {
    total_matches: usize,
    rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Serialize, PartialEq)]
struct ColumnStats {
    column: String,
    rows: usize,
    numeric: usize,
    sum: f64,
    mean: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

impl TabularBackend {
    /// Loads a CSV file with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ToolExecution`] if the file cannot be read or
    /// parsed.
    pub fn open(path: &Path) -> Result<Self, ToolError> {
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| load_error(&e))?;
        let backend = Self::from_reader(reader)?;
        debug!(path = %path.display(), rows = backend.rows.len(), "CSV loaded");
        Ok(backend)
    }

    /// Parses CSV text with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ToolExecution`] on malformed CSV.
    pub fn from_csv(text: &str) -> Result<Self, ToolError> {
        Self::from_reader(
            csv::ReaderBuilder::new()
                .flexible(true)
                .from_reader(text.as_bytes()),
        )
    }

    fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self, ToolError> {
        let headers = reader
            .headers()
            .map_err(|e| load_error(&e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()
            .map_err(|e| load_error(&e))?;
        Ok(Self { headers, rows })
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the file has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, function: &str, column: &str) -> Result<usize, ToolError> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(column))
            .ok_or_else(|| ToolError::ToolExecution {
                name: function.to_string(),
                message: format!(
                    "unknown column `{column}`; columns are: {}",
                    self.headers.join(", ")
                ),
            })
    }

    fn row_object(&self, index: usize, row: &[String]) -> Map<String, Value> {
        let mut object = Map::new();
        object.insert("_row".to_string(), json!(index));
        for (header, cell) in self.headers.iter().zip(row) {
            object.insert(header.clone(), Value::String(cell.clone()));
        }
        object
    }

    fn row_matches(re: &Regex, row: &[String], column: Option<usize>) -> bool {
        match column {
            Some(i) => row.get(i).is_some_and(|cell| re.is_match(cell)),
            None => row.iter().any(|cell| re.is_match(cell)),
        }
    }

    fn schema(&self) -> Schema {
        Schema {
            columns: self.headers.clone(),
            row_count: self.rows.len(),
            sample: self
                .rows
                .iter()
                .take(SAMPLE_ROWS)
                .enumerate()
                .map(|(i, row)| self.row_object(i, row))
                .collect(),
        }
    }

    fn page(&self, args: &RowsArgs) -> Vec<Map<String, Value>> {
        let limit = args.limit.unwrap_or(DEFAULT_PAGE).min(MAX_PAGE);
        self.rows
            .iter()
            .enumerate()
            .skip(args.offset)
            .take(limit)
            .map(|(i, row)| self.row_object(i, row))
            .collect()
    }

    fn grep(&self, function: &str, args: &GrepArgs) -> Result<Matches, ToolError> {
        let re = compile_pattern(function, &args.pattern)?;
        let column = args
            .column
            .as_deref()
            .map(|c| self.column_index(function, c))
            .transpose()?;
        let limit = args.limit.unwrap_or(DEFAULT_PAGE).min(MAX_PAGE);

        let matching: Vec<(usize, &Vec<String>)> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| Self::row_matches(&re, row, column))
            .collect();

        Ok(Matches {
            total_matches: matching.len(),
            rows: matching
                .into_iter()
                .take(limit)
                .map(|(i, row)| self.row_object(i, row))
                .collect(),
        })
    }

    fn stats(&self, function: &str, args: &StatsArgs) -> Result<ColumnStats, ToolError> {
        let target = self.column_index(function, &args.column)?;
        let filter = match &args.pattern {
            Some(pattern) => {
                let column = args
                    .filter_column
                    .as_deref()
                    .map(|c| self.column_index(function, c))
                    .transpose()?;
                Some((compile_pattern(function, pattern)?, column))
            }
            None => None,
        };

        let mut stats = ColumnStats {
            column: self.headers[target].clone(),
            rows: 0,
            numeric: 0,
            sum: 0.0,
            mean: None,
            min: None,
            max: None,
        };

        for row in &self.rows {
            if let Some((re, column)) = &filter
                && !Self::row_matches(re, row, *column)
            {
                continue;
            }
            stats.rows += 1;
            let Some(value) = row.get(target).and_then(|cell| parse_number(cell)) else {
                continue;
            };
            stats.numeric += 1;
            stats.sum += value;
            stats.min = Some(stats.min.map_or(value, |m| m.min(value)));
            stats.max = Some(stats.max.map_or(value, |m| m.max(value)));
        }

        if stats.numeric > 0 {
            #[allow(clippy::cast_precision_loss)]
            let mean = stats.sum / stats.numeric as f64;
            stats.mean = Some(mean);
        }
        Ok(stats)
    }
}

fn load_error(err: &csv::Error) -> ToolError {
    ToolError::ToolExecution {
        name: "csv".to_string(),
        message: format!("could not read CSV: {err}"),
    }
}

/// Parses a cell as a number, tolerating thousands separators, currency
/// symbols and percent signs.
fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '€' | '£' | '%' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[async_trait]
impl FunctionBackend for TabularBackend {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::without_arguments(
                "csv_schema",
                "Column names, total row count and the first rows of the CSV file.",
            ),
            ToolDefinition::new(
                "csv_rows",
                "Page through rows in file order. Each row includes its 0-based `_row` index.",
                json!({
                    "type": "object",
                    "properties": {
                        "offset": {"type": "integer", "description": "First row to return (default 0)"},
                        "limit": {"type": "integer", "description": "Rows to return (default 20, max 100)"}
                    },
                    "additionalProperties": false
                }),
            ),
            ToolDefinition::new(
                "csv_grep",
                "Find rows where a case-insensitive regex matches any cell, or one column's cell. Returns the total match count and the first matching rows.",
                json!({
                    "type": "object",
                    "properties": {
                        "pattern": {"type": "string", "description": "Regular expression"},
                        "column": {"type": "string", "description": "Restrict matching to this column"},
                        "limit": {"type": "integer", "description": "Rows to return (default 20, max 100)"}
                    },
                    "required": ["pattern"],
                    "additionalProperties": false
                }),
            ),
            ToolDefinition::new(
                "csv_stats",
                "Count, sum, mean, min and max of a numeric column, optionally over rows matching a regex.",
                json!({
                    "type": "object",
                    "properties": {
                        "column": {"type": "string", "description": "Column to aggregate"},
                        "pattern": {"type": "string", "description": "Only rows matching this regex"},
                        "filter_column": {"type": "string", "description": "Column the pattern applies to (default: any)"}
                    },
                    "required": ["column"],
                    "additionalProperties": false
                }),
            ),
        ]
    }

    async fn invoke(&self, function: &str, args: &str) -> Result<String, ToolError> {
        match function {
            "csv_schema" => to_json(function, &self.schema()),
            "csv_rows" => {
                let args: RowsArgs = parse_args(function, args)?;
                to_json(function, &self.page(&args))
            }
            "csv_grep" => {
                let args: GrepArgs = parse_args(function, args)?;
                to_json(function, &self.grep(function, &args)?)
            }
            "csv_stats" => {
                let args: StatsArgs = parse_args(function, args)?;
                to_json(function, &self.stats(function, &args)?)
            }
            other => Err(unknown_function(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const CSV: &str = "state,date,cases,hospitalized\n\
                       WA,2020-03-01,\"1,200\",40\n\
                       TX,2020-03-01,800,\n\
                       WA,2020-03-02,1500,55\n\
                       NY,2020-03-02,3000,210\n";

    fn backend() -> TabularBackend {
        TabularBackend::from_csv(CSV).unwrap_or_else(|_| unreachable!())
    }

    fn invoke(function: &str, args: Value) -> Result<Value, ToolError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap_or_else(|_| unreachable!());
        let text = rt.block_on(backend().invoke(function, &args.to_string()))?;
        Ok(serde_json::from_str(&text).unwrap_or_else(|_| unreachable!()))
    }

    #[test]
    fn test_schema() {
        let schema = invoke("csv_schema", json!({})).unwrap_or_else(|_| unreachable!());
        assert_eq!(schema["columns"], json!(["state", "date", "cases", "hospitalized"]));
        assert_eq!(schema["row_count"], 4);
        assert_eq!(schema["sample"].as_array().map(Vec::len), Some(3));
        assert_eq!(schema["sample"][0]["cases"], "1,200");
    }

    #[test]
    fn test_rows_paging() {
        let rows = invoke("csv_rows", json!({"offset": 2, "limit": 5})).unwrap_or_else(|_| unreachable!());
        let rows = rows.as_array().cloned().unwrap_or_default();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["_row"], 2);
        assert_eq!(rows[1]["state"], "NY");
    }

    #[test]
    fn test_grep_by_column() {
        let found = invoke("csv_grep", json!({"pattern": "^wa$", "column": "STATE"}))
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(found["total_matches"], 2);
        assert_eq!(found["rows"][1]["date"], "2020-03-02");
    }

    #[test]
    fn test_grep_unknown_column() {
        let result = invoke("csv_grep", json!({"pattern": "x", "column": "county"}));
        let Err(ToolError::ToolExecution { message, .. }) = result else {
            unreachable!()
        };
        assert!(message.contains("columns are: state, date"));
    }

    #[test]
    fn test_stats_with_filter() {
        let backend = backend();
        let stats = backend
            .stats(
                "csv_stats",
                &StatsArgs {
                    column: "cases".to_string(),
                    pattern: Some("^WA$".to_string()),
                    filter_column: Some("state".to_string()),
                },
            )
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.numeric, 2);
        assert!((stats.sum - 2700.0).abs() < f64::EPSILON);
        assert_eq!(stats.mean, Some(1350.0));
        assert_eq!(stats.min, Some(1200.0));
        assert_eq!(stats.max, Some(1500.0));
    }

    #[test]
    fn test_stats_skips_blank_cells() {
        let stats = invoke("csv_stats", json!({"column": "hospitalized"})).unwrap_or_else(|_| unreachable!());
        assert_eq!(stats["rows"], 4);
        assert_eq!(stats["numeric"], 3);
        assert_eq!(stats["max"], 210.0);
    }

    #[test_case("1,200", Some(1200.0) ; "thousands")]
    #[test_case("$3.50", Some(3.5) ; "currency")]
    #[test_case("12%", Some(12.0) ; "percent")]
    #[test_case("", None ; "blank")]
    #[test_case("n/a", None ; "text")]
    fn test_parse_number(cell: &str, expected: Option<f64>) {
        assert_eq!(parse_number(cell), expected);
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("covid.csv");
        std::fs::write(&path, CSV).unwrap_or_else(|_| unreachable!());
        let backend = TabularBackend::open(&path).unwrap_or_else(|_| unreachable!());
        assert_eq!(backend.len(), 4);
    }

    #[test]
    fn test_open_missing_file() {
        assert!(TabularBackend::open(Path::new("/nonexistent/data.csv")).is_err());
    }
}
