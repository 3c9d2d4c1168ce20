//! Rewrites Hive session pragmas into executable statements.
//!
//! - `SET k = v` is captured into [`RewriteResult::set_vars`] and dropped.
//! - `USE db` depends on whether a [`DatabaseMap`] is supplied:
//!   - mapped: `USE db` passes through (the executor attaches every mapped
//!     database beforehand); an unmapped name fails the whole rewrite.
//!   - legacy: `CREATE SCHEMA IF NOT EXISTS db` + `SET search_path = 'db'`.
//! - Everything else passes through trimmed.

use std::collections::BTreeMap;

use nom::{
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::char,
    combinator::eof,
    sequence::terminated,
    IResult,
};
use tracing::{debug, trace};

use crate::config::DatabaseMap;
use crate::error::{HiveError, HiveResult};

/// Output of [`rewrite`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteResult {
    /// Statements to execute, in order.
    pub statements: Vec<String>,
    /// Captured `SET` pairs; the last occurrence of a key wins.
    pub set_vars: BTreeMap<String, String>,
    /// Database named by the last `USE`, empty if there was none.
    pub current_database: String,
}

/// A recognized session pragma.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatement<'a> {
    Set { key: &'a str, value: String },
    Use { database: &'a str },
}

impl<'a> SessionStatement<'a> {
    /// Recognize `SET` or `USE` in a trimmed statement.
    pub fn parse(stmt: &'a str) -> Option<Self> {
        if let Ok((_, (key, raw))) = parse_set(stmt) {
            return Some(SessionStatement::Set {
                key,
                value: normalize_value(raw),
            });
        }
        if let Ok((_, database)) = parse_use(stmt) {
            return Some(SessionStatement::Use { database });
        }
        None
    }
}

/// True if `stmt` is a `SET`/`USE` pragma that [`rewrite`] absorbs or transforms.
pub fn is_session_statement(stmt: &str) -> bool {
    SessionStatement::parse(stmt.trim()).is_some()
}

/// Rewrite split statements into the final executable sequence.
///
/// Stops at the first `USE` of a database missing from `database_map`.
pub fn rewrite<S: AsRef<str>>(
    stmts: &[S],
    database_map: Option<&DatabaseMap>,
) -> HiveResult<RewriteResult> {
    let mut result = RewriteResult {
        statements: Vec::with_capacity(stmts.len()),
        ..Default::default()
    };

    for stmt in stmts {
        let trimmed = stmt.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }

        match SessionStatement::parse(trimmed) {
            Some(SessionStatement::Set { key, value }) => {
                trace!(key, value = %value, "captured SET");
                result.set_vars.insert(key.to_string(), value);
            }
            Some(SessionStatement::Use { database }) => {
                result.current_database = database.to_string();
                match database_map {
                    Some(map) => {
                        if !map.contains(database) {
                            return Err(HiveError::UnmappedDatabase {
                                name: database.to_string(),
                                available: map.names(),
                            });
                        }
                        result.statements.push(format!("USE {}", database));
                    }
                    None => {
                        result
                            .statements
                            .push(format!("CREATE SCHEMA IF NOT EXISTS {}", database));
                        result
                            .statements
                            .push(format!("SET search_path = '{}'", database));
                    }
                }
                trace!(database, mapped = database_map.is_some(), "rewrote USE");
            }
            None => result.statements.push(trimmed.to_string()),
        }
    }

    debug!(
        statements = result.statements.len(),
        set_vars = result.set_vars.len(),
        current_database = %result.current_database,
        "rewrote statements"
    );
    Ok(result)
}

/// `SET <key> = <value>` where the value is the rest of a single line.
fn parse_set(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = tag_no_case("SET")(input)?;
    let (input, _) = space1(input)?;
    let (input, key) = take_while1(|c: char| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | ':')
    })(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = char('=')(input)?;
    let (input, _) = space0(input)?;
    let (input, value) = terminated(take_while(|c: char| c != '\n'), eof)(input)?;
    Ok((input, (key, value)))
}

/// `USE <name>` with nothing after the name.
fn parse_use(input: &str) -> IResult<&str, &str> {
    let (input, _) = tag_no_case("USE")(input)?;
    let (input, _) = space1(input)?;
    let (input, name) = take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = eof(input)?;
    Ok((input, name))
}

fn space0(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c.is_whitespace())(input)
}

fn space1(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_whitespace())(input)
}

/// Trim, drop one trailing `;`, trim again, then strip one layer of quotes.
fn normalize_value(raw: &str) -> String {
    let value = raw.trim();
    let value = value.strip_suffix(';').unwrap_or(value).trim();
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sales_map() -> DatabaseMap {
        DatabaseMap::from_entries([("sales", "/data/sales.db")])
    }

    #[test]
    fn test_set_is_captured_not_emitted() {
        let r = rewrite(&["SET foo = 'bar'", "SELECT 1"], None).unwrap();
        assert_eq!(r.statements, vec!["SELECT 1"]);
        assert_eq!(r.set_vars.get("foo").map(String::as_str), Some("bar"));
        assert_eq!(r.current_database, "");
    }

    #[test]
    fn test_set_variants() {
        let r = rewrite(
            &[
                "set hive.exec.dynamic.partition.mode=nonstrict",
                "SET hivevar:dt = \"2024-01-01\"",
                "SET a = 1;",
                "SET empty =",
                "SET q = '",
                "SET a = 2",
            ],
            None,
        )
        .unwrap();
        assert!(r.statements.is_empty());
        let vars: Vec<(&str, &str)> = r
            .set_vars
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            vars,
            vec![
                ("a", "2"),
                ("empty", ""),
                ("hive.exec.dynamic.partition.mode", "nonstrict"),
                ("hivevar:dt", "2024-01-01"),
                ("q", "'"),
            ]
        );
    }

    #[test]
    fn test_non_pragmas_pass_through() {
        let stmts = [
            "SETTINGS x = 1",
            "SET\nx = 1\ny",
            "USE sales extra",
            "USE",
            "UPDATE t SET a = 1",
            "USE `sales`",
        ];
        let r = rewrite(&stmts, None).unwrap();
        assert_eq!(r.statements, stmts.to_vec());
        assert!(r.set_vars.is_empty());
    }

    #[test]
    fn test_set_value_after_newline() {
        let r = rewrite(&["SET x =\n  5"], None).unwrap();
        assert_eq!(r.set_vars.get("x").map(String::as_str), Some("5"));
    }

    #[test]
    fn test_use_mapped() {
        let map = sales_map();
        let r = rewrite(&["use sales", "SELECT 1"], Some(&map)).unwrap();
        assert_eq!(r.statements, vec!["USE sales", "SELECT 1"]);
        assert_eq!(r.current_database, "sales");
    }

    #[test]
    fn test_use_unmapped_fails() {
        let map = DatabaseMap::from_entries([("sales", "/a.db"), ("hr", "/b.db")]);
        let err = rewrite(&["USE finance", "SELECT 1"], Some(&map)).unwrap_err();
        match err {
            HiveError::UnmappedDatabase { name, available } => {
                assert_eq!(name, "finance");
                assert_eq!(available, vec!["hr", "sales"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_use_legacy() {
        let r = rewrite(&["USE sales", "SELECT 1"], None).unwrap();
        assert_eq!(
            r.statements,
            vec![
                "CREATE SCHEMA IF NOT EXISTS sales",
                "SET search_path = 'sales'",
                "SELECT 1",
            ]
        );
    }

    #[test]
    fn test_last_use_wins() {
        let map = DatabaseMap::from_entries([("a", ":memory:"), ("b", ":memory:")]);
        let r = rewrite(&["USE a", "USE b"], Some(&map)).unwrap();
        assert_eq!(r.current_database, "b");
        assert_eq!(r.statements, vec!["USE a", "USE b"]);
    }

    #[test]
    fn test_empty_statements_skipped() {
        let r = rewrite(&["  ", "SELECT 2  "], None).unwrap();
        assert_eq!(r.statements, vec!["SELECT 2"]);
    }

    #[test]
    fn test_is_session_statement() {
        assert!(is_session_statement("  SET a=b "));
        assert!(is_session_statement("use db1"));
        assert!(!is_session_statement("SELECT 1"));
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value(" 'x' ; "), "x");
        assert_eq!(normalize_value("\"a b\""), "a b");
        assert_eq!(normalize_value("'mixed\""), "'mixed\"");
        assert_eq!(normalize_value("''"), "");
        assert_eq!(normalize_value("'''"), "'");
    }
}
