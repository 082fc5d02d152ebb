//! SQLite functions for the `@sqlsearch` agent.
//!
//! The database is opened read-only and only `SELECT`/`WITH` statements are
//! accepted, so nothing the model writes can modify data.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::agent::executor::{FunctionBackend, parse_args, to_json, unknown_function};
use crate::agent::tool::ToolDefinition;
use crate::error::ToolError;

/// Maximum rows returned by one query.
pub const MAX_ROWS: usize = 200;
/// Maximum SQL statement length accepted from the model.
const MAX_SQL_LEN: usize = 10_000;

/// Read-only SQLite database exposed as functions.
#[derive(Debug)]
pub struct SqlBackend {
    conn: Mutex<Connection>,
}

#[derive(Deserialize)]
struct DescribeArgs {
    table: String,
}

#[derive(Deserialize)]
struct QueryArgs {
    sql: String,
}

#[derive(Debug, Serialize)]
struct ColumnInfo {
    name: String,
    #[serde(rename = "type")]
    declared_type: String,
    not_null: bool,
    primary_key: bool,
}

#[derive(Debug, Serialize)]
struct QueryOutput {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    truncated: bool,
}

impl SqlBackend {
    /// Opens `path` read-only.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Sqlite`] if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, ToolError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps an existing connection.
    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<T>(
        &self,
        function: &str,
        f: impl FnOnce(&Connection) -> Result<T, ToolError>,
    ) -> Result<T, ToolError> {
        let conn = self.conn.lock().map_err(|_| ToolError::ToolExecution {
            name: function.to_string(),
            message: "database connection poisoned".to_string(),
        })?;
        f(&conn)
    }

    fn list_tables(conn: &Connection) -> Result<Vec<String>, ToolError> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn describe_table(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>, ToolError> {
        let mut stmt =
            conn.prepare("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map([table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    declared_type: row.get(1)?,
                    not_null: row.get::<_, i64>(2)? != 0,
                    primary_key: row.get::<_, i64>(3)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(ToolError::ToolExecution {
                name: "describe_table".to_string(),
                message: format!("no such table: {table}"),
            });
        }
        Ok(columns)
    }

    fn run_query(conn: &Connection, sql: &str) -> Result<QueryOutput, ToolError> {
        let sql = check_read_only(sql)?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut truncated = false;
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            if rows.len() == MAX_ROWS {
                truncated = true;
                break;
            }
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(to_value(row.get_ref(i)?));
            }
            rows.push(values);
        }

        debug!(rows = rows.len(), truncated, "Query executed");
        Ok(QueryOutput {
            columns,
            rows,
            truncated,
        })
    }
}

/// Accepts a single `SELECT` or `WITH` statement, returning it without the
/// trailing semicolon.
fn check_read_only(sql: &str) -> Result<&str, ToolError> {
    let reject = |message: &str| ToolError::ToolExecution {
        name: "run_query".to_string(),
        message: message.to_string(),
    };

    if sql.len() > MAX_SQL_LEN {
        return Err(reject("statement too long"));
    }
    let statement = sql.trim().trim_end_matches(';').trim_end();
    if statement.contains(';') {
        return Err(reject("only one statement is allowed"));
    }
    let keyword = statement
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if keyword != "select" && keyword != "with" {
        return Err(reject("only SELECT queries are allowed"));
    }
    Ok(statement)
}

fn to_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => json!(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}

#[async_trait]
impl FunctionBackend for SqlBackend {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::without_arguments(
                "list_tables",
                "List the tables and views in the database.",
            ),
            ToolDefinition::new(
                "describe_table",
                "Describe a table's columns: name, declared type, NOT NULL and primary key flags.",
                json!({
                    "type": "object",
                    "properties": {
                        "table": {"type": "string", "description": "Table name"}
                    },
                    "required": ["table"],
                    "additionalProperties": false
                }),
            ),
            ToolDefinition::new(
                "run_query",
                "Run one read-only SELECT statement. Returns column names and up to 200 rows.",
                json!({
                    "type": "object",
                    "properties": {
                        "sql": {"type": "string", "description": "A single SELECT or WITH statement"}
                    },
                    "required": ["sql"],
                    "additionalProperties": false
                }),
            ),
        ]
    }

    async fn invoke(&self, function: &str, args: &str) -> Result<String, ToolError> {
        match function {
            "list_tables" => {
                let tables = self.with_conn(function, Self::list_tables)?;
                to_json(function, &tables)
            }
            "describe_table" => {
                let args: DescribeArgs = parse_args(function, args)?;
                let columns = self.with_conn(function, |c| Self::describe_table(c, &args.table))?;
                to_json(function, &columns)
            }
            "run_query" => {
                let args: QueryArgs = parse_args(function, args)?;
                let output = self.with_conn(function, |c| Self::run_query(c, &args.sql))?;
                to_json(function, &output)
            }
            other => Err(unknown_function(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn fixture() -> (tempfile::TempDir, SqlBackend) {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("sales.db");
        let conn = Connection::open(&path).unwrap_or_else(|_| unreachable!());
        conn.execute_batch(
            "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, city TEXT);
             CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER, total REAL, note BLOB);
             INSERT INTO customers VALUES (1, 'Ada', 'London'), (2, 'Grace', NULL);
             INSERT INTO orders VALUES (1, 1, 12.5, x'00ff'), (2, 1, 7.25, NULL), (3, 2, 30.0, NULL);",
        )
        .unwrap_or_else(|_| unreachable!());
        drop(conn);
        let backend = SqlBackend::open(&path).unwrap_or_else(|_| unreachable!());
        (dir, backend)
    }

    fn invoke(backend: &SqlBackend, function: &str, args: Value) -> Result<Value, ToolError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap_or_else(|_| unreachable!());
        let text = rt.block_on(backend.invoke(function, &args.to_string()))?;
        Ok(serde_json::from_str(&text).unwrap_or_else(|_| unreachable!()))
    }

    #[test]
    fn test_list_tables() {
        let (_dir, backend) = fixture();
        let tables = invoke(&backend, "list_tables", json!({})).unwrap_or_else(|_| unreachable!());
        assert_eq!(tables, json!(["customers", "orders"]));
    }

    #[test]
    fn test_describe_table() {
        let (_dir, backend) = fixture();
        let columns = invoke(&backend, "describe_table", json!({"table": "customers"}))
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(columns[0]["name"], "id");
        assert_eq!(columns[0]["primary_key"], true);
        assert_eq!(columns[1]["type"], "TEXT");
        assert_eq!(columns[1]["not_null"], true);
    }

    #[test]
    fn test_describe_missing_table() {
        let (_dir, backend) = fixture();
        let result = invoke(&backend, "describe_table", json!({"table": "invoices"}));
        assert!(matches!(result, Err(ToolError::ToolExecution { .. })));
    }

    #[test]
    fn test_run_query_converts_values() {
        let (_dir, backend) = fixture();
        let output = invoke(
            &backend,
            "run_query",
            json!({"sql": "SELECT c.name, c.city, SUM(o.total) AS spent, MAX(o.note) AS note \
                           FROM customers c JOIN orders o ON o.customer_id = c.id \
                           GROUP BY c.id ORDER BY c.id;"}),
        )
        .unwrap_or_else(|_| unreachable!());

        assert_eq!(output["columns"], json!(["name", "city", "spent", "note"]));
        assert_eq!(output["rows"][0], json!(["Ada", "London", 19.75, "<blob 2 bytes>"]));
        assert_eq!(output["rows"][1], json!(["Grace", null, 30.0, null]));
        assert_eq!(output["truncated"], false);
    }

    #[test]
    fn test_run_query_truncates() {
        let (_dir, backend) = fixture();
        let output = invoke(
            &backend,
            "run_query",
            json!({"sql": "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 500) SELECT x FROM n"}),
        )
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(output["rows"].as_array().map(Vec::len), Some(MAX_ROWS));
        assert_eq!(output["truncated"], true);
    }

    #[test]
    fn test_sql_error_reaches_model() {
        let (_dir, backend) = fixture();
        let result = invoke(&backend, "run_query", json!({"sql": "SELECT * FROM invoices"}));
        assert!(matches!(result, Err(ToolError::Sqlite(_))));
    }

    #[test_case("DELETE FROM orders" ; "delete")]
    #[test_case("SELECT 1; DROP TABLE orders" ; "stacked")]
    #[test_case("PRAGMA writable_schema = 1" ; "pragma")]
    #[test_case("" ; "empty")]
    fn test_rejects_non_select(sql: &str) {
        assert!(check_read_only(sql).is_err());
    }

    #[test_case("SELECT 1;" , "SELECT 1" ; "trailing semicolon")]
    #[test_case("  with t as (select 1) select * from t" , "with t as (select 1) select * from t" ; "lowercase with")]
    fn test_accepts_select(sql: &str, expected: &str) {
        assert_eq!(check_read_only(sql).unwrap_or_default(), expected);
    }
}
