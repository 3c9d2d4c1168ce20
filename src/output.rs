//! Result-set formatting.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use serde_json::Value;

use crate::error::HiveError;

/// Output format for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// Aligned columns with a two-space gutter.
    #[default]
    Table,
    Csv,
    Tsv,
    /// Pretty-printed array of objects.
    Json,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Table, Format::Csv, Format::Tsv, Format::Json];

    fn name(self) -> &'static str {
        match self {
            Format::Table => "table",
            Format::Csv => "csv",
            Format::Tsv => "tsv",
            Format::Json => "json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = HiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted.is_empty() {
            return Ok(Format::Table);
        }
        Format::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = Format::ALL.iter().map(|f| f.name()).collect();
                HiveError::Config(format!(
                    "invalid output format '{}' (valid: {})",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Rows returned by one statement, cells in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Write `rs` to `out` in the requested format.
///
/// The header is written even when there are no rows. Only a statement
/// with no result columns at all prints nothing in the text formats.
pub fn print_rows<W: Write>(rs: &ResultSet, format: Format, out: &mut W) -> io::Result<()> {
    if rs.columns.is_empty() && format != Format::Json {
        return Ok(());
    }
    match format {
        Format::Table => print_table(rs, out),
        Format::Csv => print_delimited(rs, ',', out),
        Format::Tsv => print_delimited(rs, '\t', out),
        Format::Json => print_json(rs, out),
    }
}

fn print_table<W: Write>(rs: &ResultSet, out: &mut W) -> io::Result<()> {
    let rendered: Vec<Vec<String>> = rs
        .rows
        .iter()
        .map(|row| row.iter().map(value_to_string).collect())
        .collect();

    // Calculate column widths
    let mut widths: Vec<usize> = rs.columns.iter().map(|c| c.chars().count()).collect();
    for row in &rendered {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    write_aligned(out, &rs.columns, &widths)?;
    for row in &rendered {
        write_aligned(out, row, &widths)?;
    }
    Ok(())
}

fn write_aligned<W: Write, S: AsRef<str>>(out: &mut W, cells: &[S], widths: &[usize]) -> io::Result<()> {
    let last = cells.len().saturating_sub(1);
    for (i, cell) in cells.iter().enumerate() {
        let cell = cell.as_ref();
        if i == last {
            write!(out, "{}", cell)?;
        } else {
            let width = widths.get(i).copied().unwrap_or(0) + 2;
            write!(out, "{:width$}", cell, width = width)?;
        }
    }
    writeln!(out)
}

fn print_delimited<W: Write>(rs: &ResultSet, delimiter: char, out: &mut W) -> io::Result<()> {
    write_record(out, rs.columns.iter().map(String::as_str), delimiter)?;
    for row in &rs.rows {
        let cells: Vec<String> = row.iter().map(value_to_string).collect();
        write_record(out, cells.iter().map(String::as_str), delimiter)?;
    }
    Ok(())
}

fn write_record<'a, W: Write>(
    out: &mut W,
    fields: impl Iterator<Item = &'a str>,
    delimiter: char,
) -> io::Result<()> {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            write!(out, "{}", delimiter)?;
        }
        if needs_quotes(field, delimiter) {
            write!(out, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            write!(out, "{}", field)?;
        }
    }
    writeln!(out)
}

/// RFC 4180 quoting, plus fields with leading whitespace.
fn needs_quotes(field: &str, delimiter: char) -> bool {
    field.contains(delimiter)
        || field.contains(['"', '\r', '\n'])
        || field.starts_with(char::is_whitespace)
}

fn print_json<W: Write>(rs: &ResultSet, out: &mut W) -> io::Result<()> {
    let objects: Vec<Value> = rs
        .rows
        .iter()
        .map(|row| {
            let obj: serde_json::Map<String, Value> = rs
                .columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect();
            Value::Object(obj)
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &objects)?;
    writeln!(out)
}

/// Render a cell for the text formats.
pub fn value_to_string(val: &Value) -> String {
    match val {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}
