//! Detection of Hive constructs with no safe translation.
//!
//! Findings are advisory. They never alter the statement stream; the caller
//! decides whether any of them should abort the run.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Longest statement excerpt carried by a [`Finding`], in characters.
pub const DISPLAY_LEN: usize = 80;

/// A detected unsupported construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Offending statement, whitespace-normalized and truncated for display.
    pub statement: String,
    /// Label of the matched construct, e.g. `LATERAL VIEW`.
    pub keyword: &'static str,
    /// Why it has no translation and what to use instead.
    pub reason: &'static str,
}

struct Rule {
    pattern: Regex,
    keyword: &'static str,
    reason: &'static str,
}

impl Rule {
    fn new(pattern: &str, keyword: &'static str, reason: &'static str) -> Self {
        Self {
            // Catalog patterns are literals covered by `test_catalog_compiles`.
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("bad pattern for {keyword}: {e}")),
            keyword,
            reason,
        }
    }
}

static CATALOG: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // data loading
        Rule::new(r"(?i)^\s*LOAD\s+DATA", "LOAD DATA", "Use read_csv/read_parquet/COPY instead"),
        Rule::new(r"(?i)^\s*EXPORT\s+TABLE", "EXPORT TABLE", "Use COPY ... TO instead"),
        Rule::new(r"(?i)^\s*IMPORT\s+TABLE", "IMPORT TABLE", "Use COPY ... FROM instead"),
        // udf / transform
        Rule::new(
            r"(?i)^\s*ADD\s+JAR",
            "ADD JAR",
            "Java UDFs not supported; use extensions or native functions",
        ),
        Rule::new(r"(?i)^\s*ADD\s+FILE", "ADD FILE", "Distributed file adding not supported"),
        Rule::new(
            r"(?i)^\s*CREATE\s+(TEMPORARY\s+)?FUNCTION",
            "CREATE FUNCTION",
            "Use CREATE MACRO or native functions",
        ),
        Rule::new(
            r"(?i)\bTRANSFORM\s*\(",
            "TRANSFORM",
            "TRANSFORM with external scripts not supported",
        ),
        Rule::new(
            r"(?i)\bMAP\s*\([^)]+\)\s+USING",
            "MAP...USING",
            "MAP script transformation not supported",
        ),
        Rule::new(
            r"(?i)\bREDUCE\s*\([^)]+\)\s+USING",
            "REDUCE...USING",
            "REDUCE script transformation not supported",
        ),
        // metastore ddl
        Rule::new(
            r"(?i)^\s*MSCK\s+REPAIR",
            "MSCK REPAIR",
            "Partition repair not needed; there is no Hive metastore",
        ),
        Rule::new(r"(?i)^\s*ANALYZE\s+TABLE", "ANALYZE TABLE", "Use plain ANALYZE instead"),
        Rule::new(
            r"(?i)^\s*TRUNCATE\s+TABLE",
            "TRUNCATE TABLE",
            "Use DELETE FROM table or DROP TABLE + CREATE TABLE",
        ),
        Rule::new(
            r"(?i)^\s*ALTER\s+TABLE\s+\S+\s+(ADD|DROP|RENAME)\s+PARTITION",
            "ALTER TABLE...PARTITION",
            "Hive partition management not supported",
        ),
        Rule::new(
            r"(?i)^\s*ALTER\s+TABLE\s+\S+\s+RECOVER\s+PARTITIONS",
            "ALTER TABLE...RECOVER PARTITIONS",
            "Partition recovery not supported",
        ),
        // clauses found anywhere in a statement
        Rule::new(
            r"(?i)\bLATERAL\s+VIEW",
            "LATERAL VIEW",
            "Use UNNEST or list functions instead",
        ),
        Rule::new(
            r"(?i)\bCLUSTER\s+BY\b",
            "CLUSTER BY",
            "Use ORDER BY for sorting; clustering not supported",
        ),
        Rule::new(
            r"(?i)\bDISTRIBUTE\s+BY\b",
            "DISTRIBUTE BY",
            "Distribution hints have no effect on a single engine",
        ),
        Rule::new(
            r"(?i)\bSORT\s+BY\b",
            "SORT BY",
            "Use ORDER BY instead for deterministic sorting",
        ),
        Rule::new(
            r"(?i)\bTABLESAMPLE\s*\(",
            "TABLESAMPLE",
            "Use the USING SAMPLE clause instead",
        ),
        // metastore queries
        Rule::new(
            r"(?i)^\s*SHOW\s+PARTITIONS",
            "SHOW PARTITIONS",
            "Hive partitions not applicable; data is file-based",
        ),
        Rule::new(
            r"(?i)^\s*SHOW\s+TBLPROPERTIES",
            "SHOW TBLPROPERTIES",
            "Table properties are not stored in metastore format",
        ),
        Rule::new(
            r"(?i)^\s*DESCRIBE\s+EXTENDED",
            "DESCRIBE EXTENDED",
            "Use DESCRIBE or PRAGMA table_info instead",
        ),
        Rule::new(
            r"(?i)^\s*DESCRIBE\s+FORMATTED",
            "DESCRIBE FORMATTED",
            "Use DESCRIBE or PRAGMA table_info instead",
        ),
        // storage format hints
        Rule::new(
            r"(?i)\bSTORED\s+AS\b",
            "STORED AS",
            "Storage format hint ignored; use read_parquet/read_csv explicitly",
        ),
        Rule::new(
            r"(?i)\bROW\s+FORMAT\b",
            "ROW FORMAT",
            "Row format specification not supported",
        ),
        Rule::new(r"(?i)\bSERDE\b", "SERDE", "SerDe not supported; use native readers"),
        Rule::new(
            r"(?i)\bLOCATION\s+'",
            "LOCATION",
            "External table location; use CREATE TABLE AS or views over read_* functions",
        ),
        // locking
        Rule::new(r"(?i)^\s*LOCK\s+TABLE", "LOCK TABLE", "Explicit locking not supported"),
        Rule::new(r"(?i)^\s*UNLOCK\s+TABLE", "UNLOCK TABLE", "Explicit unlocking not supported"),
    ]
});

/// Scan every statement against the catalog.
///
/// All matching rules report, so one statement may yield several findings.
pub fn detect_unsupported<S: AsRef<str>>(stmts: &[S]) -> Vec<Finding> {
    let mut findings = Vec::new();

    for stmt in stmts {
        let trimmed = stmt.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        for rule in CATALOG.iter().filter(|r| r.pattern.is_match(trimmed)) {
            findings.push(Finding {
                statement: truncate_statement(trimmed, DISPLAY_LEN),
                keyword: rule.keyword,
                reason: rule.reason,
            });
        }
    }

    debug!(findings = findings.len(), "scanned for unsupported constructs");
    findings
}

/// True as soon as any statement matches any rule.
pub fn has_unsupported<S: AsRef<str>>(stmts: &[S]) -> bool {
    stmts.iter().any(|stmt| {
        let trimmed = stmt.as_ref().trim();
        !trimmed.is_empty() && CATALOG.iter().any(|r| r.pattern.is_match(trimmed))
    })
}

/// Collapse whitespace runs to single spaces and cap at `max_len` chars.
fn truncate_statement(stmt: &str, max_len: usize) -> String {
    let normalized = stmt.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() <= max_len {
        return normalized;
    }
    let mut out: String = normalized.chars().take(max_len.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keywords(stmts: &[&str]) -> Vec<&'static str> {
        detect_unsupported(stmts).into_iter().map(|f| f.keyword).collect()
    }

    #[test]
    fn test_catalog_compiles() {
        assert_eq!(CATALOG.len(), 29);
    }

    #[test]
    fn test_clean_statements() {
        let stmts = ["SELECT * FROM t ORDER BY a", "CREATE TABLE t (a INT)", "USE sales"];
        assert!(detect_unsupported(&stmts).is_empty());
        assert!(!has_unsupported(&stmts));
    }

    #[test]
    fn test_statement_level_patterns() {
        assert_eq!(
            keywords(&[
                "LOAD DATA INPATH '/x' INTO TABLE t",
                "msck repair table t",
                "ALTER TABLE logs ADD PARTITION (dt='2024')",
                "describe formatted t",
                "CREATE TEMPORARY FUNCTION f AS 'com.x.F'",
            ]),
            vec![
                "LOAD DATA",
                "MSCK REPAIR",
                "ALTER TABLE...PARTITION",
                "DESCRIBE FORMATTED",
                "CREATE FUNCTION",
            ]
        );
    }

    #[test]
    fn test_anchored_patterns_need_leading_keyword() {
        assert!(keywords(&["SELECT 'LOAD DATA' FROM t"]).is_empty());
    }

    #[test]
    fn test_multiple_findings_per_statement() {
        let findings = detect_unsupported(&[
            "CREATE TABLE t (a INT) ROW FORMAT DELIMITED STORED AS TEXTFILE",
        ]);
        let kws: Vec<_> = findings.iter().map(|f| f.keyword).collect();
        assert_eq!(kws, vec!["STORED AS", "ROW FORMAT"]);
        assert_eq!(findings[0].statement, findings[1].statement);
    }

    #[test]
    fn test_clause_patterns() {
        assert_eq!(
            keywords(&[
                "SELECT a FROM t LATERAL VIEW explode(b) x AS c",
                "SELECT a FROM t DISTRIBUTE BY a SORT BY a",
                "SELECT TRANSFORM (a) USING 'cat' FROM t",
                "FROM t MAP (a, b) USING 'x.py' AS c",
                "SELECT * FROM t TABLESAMPLE(10 PERCENT)",
                "CREATE EXTERNAL TABLE t (a INT) LOCATION '/warehouse/t'",
            ]),
            vec![
                "LATERAL VIEW",
                "DISTRIBUTE BY",
                "SORT BY",
                "TRANSFORM",
                "MAP...USING",
                "TABLESAMPLE",
                "LOCATION",
            ]
        );
    }

    #[test]
    fn test_word_boundaries() {
        assert!(keywords(&["SELECT resort_by FROM t", "SELECT x FROM serdes"]).is_empty());
    }

    #[test]
    fn test_truncation() {
        let long = format!("SELECT   {}\n FROM t CLUSTER BY a", "x, ".repeat(40));
        let findings = detect_unsupported(&[long.as_str()]);
        assert_eq!(findings.len(), 1);
        let shown = &findings[0].statement;
        assert_eq!(shown.chars().count(), DISPLAY_LEN);
        assert!(shown.starts_with("SELECT x, x,"));
        assert!(shown.ends_with("..."));
    }

    #[test]
    fn test_short_statement_whitespace_normalized() {
        let findings = detect_unsupported(&["LOCK   TABLE\n\tt"]);
        assert_eq!(findings[0].statement, "LOCK TABLE t");
        assert_eq!(findings[0].reason, "Explicit locking not supported");
    }

    #[test]
    fn test_truncation_counts_chars() {
        let s = "é".repeat(100);
        let out = truncate_statement(&s, 80);
        assert_eq!(out.chars().count(), 80);
    }
}
