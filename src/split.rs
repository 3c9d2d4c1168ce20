//! Quote- and comment-aware statement splitter.
//!
//! Splits a script on `;` without a SQL parser. The scanner tracks exactly
//! one lexical context at a time, so a position can never be "in a string
//! and in a comment" simultaneously.

use std::iter::Peekable;
use std::str::Chars;

use tracing::debug;

use crate::error::{HiveError, HiveResult};

/// Lexical context of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    SingleQuote,
    DoubleQuote,
    LineComment,
    BlockComment,
}

impl ScanState {
    /// States that are an error when the input ends inside them.
    fn is_unterminated(self) -> bool {
        matches!(
            self,
            ScanState::SingleQuote | ScanState::DoubleQuote | ScanState::BlockComment
        )
    }
}

/// Split `sql` into trimmed, non-empty statements in source order.
///
/// Comments are dropped (a line comment keeps its terminating newline).
/// Fails without returning partial output if the script ends inside a
/// quoted literal, quoted identifier or block comment.
pub fn split_statements(sql: &str) -> HiveResult<Vec<String>> {
    let mut stmts = Vec::new();
    let mut buf = String::new();
    let mut state = ScanState::Normal;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        state = match state {
            ScanState::LineComment => {
                if ch == '\n' {
                    buf.push(ch);
                    ScanState::Normal
                } else {
                    ScanState::LineComment
                }
            }
            ScanState::BlockComment => {
                if ch == '*' && eat(&mut chars, '/') {
                    ScanState::Normal
                } else {
                    ScanState::BlockComment
                }
            }
            ScanState::SingleQuote => {
                buf.push(ch);
                if ch != '\'' {
                    ScanState::SingleQuote
                } else if eat(&mut chars, '\'') {
                    // '' is an escaped quote, not a terminator
                    buf.push('\'');
                    ScanState::SingleQuote
                } else {
                    ScanState::Normal
                }
            }
            ScanState::DoubleQuote => {
                buf.push(ch);
                if ch == '"' {
                    ScanState::Normal
                } else {
                    ScanState::DoubleQuote
                }
            }
            ScanState::Normal => match ch {
                '-' if eat(&mut chars, '-') => ScanState::LineComment,
                '/' if eat(&mut chars, '*') => ScanState::BlockComment,
                '\'' => {
                    buf.push(ch);
                    ScanState::SingleQuote
                }
                '"' => {
                    buf.push(ch);
                    ScanState::DoubleQuote
                }
                ';' => {
                    flush(&mut buf, &mut stmts);
                    ScanState::Normal
                }
                _ => {
                    buf.push(ch);
                    ScanState::Normal
                }
            },
        };
    }

    if state.is_unterminated() {
        return Err(HiveError::Unterminated);
    }
    flush(&mut buf, &mut stmts);

    debug!(statements = stmts.len(), "split script");
    Ok(stmts)
}

/// Consume the next char if it equals `expected`.
fn eat(chars: &mut Peekable<Chars<'_>>, expected: char) -> bool {
    chars.next_if_eq(&expected).is_some()
}

fn flush(buf: &mut String, stmts: &mut Vec<String>) {
    let stmt = buf.trim();
    if !stmt.is_empty() {
        stmts.push(stmt.to_string());
    }
    buf.clear();
}
