//! Statement execution over sqlx.
//!
//! Runs rewritten statements in order on a single pooled connection, so
//! session state (attached databases, `USE`, search path) carries from one
//! statement to the next.

use std::io::Write;

use serde_json::Value;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Column, Executor, Row, TypeInfo};
use tracing::{debug, info};

use crate::config::DatabaseMap;
use crate::error::{HiveError, HiveResult};
use crate::output::{self, Format, ResultSet};

/// Leading keywords of statements that produce rows.
const ROW_KEYWORDS: [&str; 6] = ["select", "with", "show", "describe", "pragma", "values"];

/// Executes a statement sequence and prints result sets.
#[derive(Debug, Clone)]
pub struct Runner {
    /// sqlx connection URL, e.g. `sqlite::memory:` or `postgres://host/db`.
    pub database_url: String,
    pub format: Format,
    /// When set, every entry is attached before the first statement runs.
    pub database_map: Option<DatabaseMap>,
}

impl Runner {
    pub fn new(database_url: impl Into<String>, format: Format) -> Self {
        Self {
            database_url: database_url.into(),
            format,
            database_map: None,
        }
    }

    pub fn with_database_map(mut self, map: Option<DatabaseMap>) -> Self {
        self.database_map = map;
        self
    }

    /// Open a single-connection pool.
    pub async fn connect(&self) -> HiveResult<AnyPool> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(&self.database_url)
            .await
            .map_err(|e| HiveError::Connection(e.to_string()))?;

        info!(url = %self.database_url, "connected");
        Ok(pool)
    }

    /// Connect, attach mapped databases, then run `statements` in order.
    pub async fn run<W: Write>(&self, statements: &[String], out: &mut W) -> HiveResult<()> {
        let pool = self.connect().await?;

        if let Some(map) = &self.database_map {
            for stmt in attach_statements(map) {
                exec(&pool, &stmt).await?;
            }
        }

        for stmt in statements {
            let sql = stmt.trim();
            if sql.is_empty() {
                continue;
            }

            if returns_rows(sql) {
                let rs = fetch(&pool, sql).await?;
                debug!(rows = rs.rows.len(), "fetched");
                output::print_rows(&rs, self.format, out)?;
            } else {
                exec(&pool, sql).await?;
            }
        }

        pool.close().await;
        Ok(())
    }
}

/// `ATTACH` for every mapped database (name order), then `USE` of the default.
pub fn attach_statements(map: &DatabaseMap) -> Vec<String> {
    let mut stmts: Vec<String> = map
        .databases
        .iter()
        .map(|(name, location)| format!("ATTACH {} AS {}", quote_literal(location), ident(name)))
        .collect();
    if let Some(default) = &map.default {
        stmts.push(format!("USE {}", ident(default)));
    }
    stmts
}

/// Heuristic on the leading keyword.
pub fn returns_rows(stmt: &str) -> bool {
    let lower = stmt.trim_start().to_ascii_lowercase();
    ROW_KEYWORDS.iter().any(|kw| lower.starts_with(kw))
}

/// Bare identifier when it is `[A-Za-z0-9_]+`, else a double-quoted one.
pub fn ident(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Single-quoted SQL string literal.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

async fn exec(pool: &AnyPool, sql: &str) -> HiveResult<()> {
    debug!(sql, "exec");
    sqlx::query(sql)
        .execute(pool)
        .await
        .map_err(|e| HiveError::execution(e.to_string(), sql))?;
    Ok(())
}

async fn fetch(pool: &AnyPool, sql: &str) -> HiveResult<ResultSet> {
    debug!(sql, "query");
    let rows: Vec<AnyRow> = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .map_err(|e| HiveError::execution(e.to_string(), sql))?;

    let columns = match rows.first() {
        Some(row) => column_names(row.columns()),
        // no rows to read names from; ask the driver for the result shape
        None => {
            let described = pool
                .describe(sql)
                .await
                .map_err(|e| HiveError::execution(e.to_string(), sql))?;
            column_names(described.columns())
        }
    };

    Ok(ResultSet {
        columns,
        rows: rows.iter().map(row_to_values).collect(),
    })
}

fn column_names<C: Column>(columns: &[C]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

/// Convert an AnyRow to JSON cells in column order.
///
/// Expression columns (literals, aggregates) carry no declared type, so
/// anything not recognized by name is decoded from the value itself.
fn row_to_values(row: &AnyRow) -> Vec<Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| match column.type_info().name() {
            "BOOL" | "BOOLEAN" => row
                .try_get::<bool, _>(i)
                .map(Value::Bool)
                .unwrap_or(Value::Null),
            "INT2" | "INT4" | "INT8" | "INTEGER" | "BIGINT" | "SMALLINT" => row
                .try_get::<i64, _>(i)
                .map(|v| Value::Number(v.into()))
                .unwrap_or(Value::Null),
            "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE" => decode_float(row, i),
            _ => decode_any(row, i),
        })
        .collect()
}

fn decode_float(row: &AnyRow, i: usize) -> Value {
    row.try_get::<f64, _>(i)
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Type name unknown to us: try text first, then numbers, then bool.
fn decode_any(row: &AnyRow, i: usize) -> Value {
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(i) {
        return Value::String(s);
    }
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(i) {
        return Value::Number(v.into());
    }
    if let Ok(Some(_)) = row.try_get::<Option<f64>, _>(i) {
        return decode_float(row, i);
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(i) {
        return Value::Bool(b);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MEMORY;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("SELECT 1"));
        assert!(returns_rows("  with x AS (SELECT 1) SELECT * FROM x"));
        assert!(returns_rows("DESCRIBE t"));
        assert!(returns_rows("values (1)"));
        assert!(!returns_rows("INSERT INTO t SELECT 1"));
        assert!(!returns_rows("CREATE SCHEMA IF NOT EXISTS s"));
    }

    #[test]
    fn test_ident() {
        assert_eq!(ident("sales_2024"), "sales_2024");
        assert_eq!(ident("my-db"), "\"my-db\"");
        assert_eq!(ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("/data/o'neil.db"), "'/data/o''neil.db'");
    }

    #[test]
    fn test_attach_statements() {
        let mut map = DatabaseMap::from_entries([("sales", "/data/sales.db"), ("scratch", MEMORY)]);
        map.default = Some("sales".into());
        assert_eq!(
            attach_statements(&map),
            vec![
                "ATTACH '/data/sales.db' AS sales",
                "ATTACH ':memory:' AS scratch",
                "USE sales",
            ]
        );
    }

    #[tokio::test]
    async fn test_run_against_sqlite() {
        let runner = Runner::new("sqlite::memory:", Format::Csv);
        let stmts: Vec<String> = [
            "CREATE TABLE users (id INTEGER, name TEXT)",
            "INSERT INTO users VALUES (1, 'alice'), (2, 'bob')",
            "SELECT name FROM users ORDER BY id",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut out = Vec::new();
        runner.run(&stmts, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "name\nalice\nbob\n");
    }

    #[tokio::test]
    async fn test_run_attaches_mapped_databases() {
        let map = DatabaseMap::from_entries([("aux", MEMORY)]);
        let runner = Runner::new("sqlite::memory:", Format::Tsv).with_database_map(Some(map));
        let stmts = vec![
            "CREATE TABLE aux.t (label TEXT)".to_string(),
            "INSERT INTO aux.t VALUES ('x')".to_string(),
            "SELECT label FROM aux.t".to_string(),
        ];

        let mut out = Vec::new();
        runner.run(&stmts, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "label\nx\n");
    }

    #[tokio::test]
    async fn test_expression_columns_are_decoded() {
        let runner = Runner::new("sqlite::memory:", Format::Csv);
        let stmts: Vec<String> = [
            "CREATE TABLE t (n INTEGER)",
            "INSERT INTO t VALUES (1), (2)",
            "SELECT 1 AS x, 'a' AS y, NULL AS z, 1.5 AS w",
            "SELECT count(*) AS c, sum(n) + 10 AS s FROM t",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut out = Vec::new();
        runner.run(&stmts, &mut out).await.unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "x,y,z,w\n1,a,NULL,1.5\nc,s\n2,13\n"
        );
    }

    #[tokio::test]
    async fn test_empty_result_keeps_header() {
        let setup = "CREATE TABLE t (a INTEGER, b TEXT)";
        let query = "SELECT a, b FROM t";
        for (format, expected) in [
            (Format::Table, "a  b\n"),
            (Format::Csv, "a,b\n"),
            (Format::Tsv, "a\tb\n"),
            (Format::Json, "[]\n"),
        ] {
            let runner = Runner::new("sqlite::memory:", format);
            let mut out = Vec::new();
            runner
                .run(&[setup.to_string(), query.to_string()], &mut out)
                .await
                .unwrap();
            assert_eq!(String::from_utf8(out).unwrap(), expected, "format {format}");
        }
    }

    #[tokio::test]
    async fn test_failed_statement_carries_sql() {
        let runner = Runner::new("sqlite::memory:", Format::Table);
        let stmts = vec!["SELECT * FROM missing_table".to_string()];
        let err = runner.run(&stmts, &mut Vec::new()).await.unwrap_err();
        match err {
            HiveError::Execution { sql, .. } => assert_eq!(sql, "SELECT * FROM missing_table"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
