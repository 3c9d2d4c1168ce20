//! Placeholder substitution.
//!
//! Replaces `${conf:KEY}`, `${var:KEY}` and `${env:KEY}` with their bound
//! values. The pass is purely textual and single-shot: inserted values are
//! never re-scanned and never quoted.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::value,
    sequence::{delimited, separated_pair},
    IResult,
};
use tracing::debug;

use crate::error::{HiveError, HiveResult};
use crate::vars::{Bindings, Namespace};

/// Substitute every placeholder in `sql`.
///
/// With `strict` set, all unresolved placeholders are collected and reported
/// together once the scan completes. Otherwise they are left in place.
pub fn substitute(sql: &str, bindings: &Bindings, strict: bool) -> HiveResult<String> {
    let mut out = String::with_capacity(sql.len());
    let mut missing: Vec<String> = Vec::new();
    let mut rest = sql;

    while let Some(pos) = rest.find("${") {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];

        match parse_placeholder(candidate) {
            Ok((after, (ns, key))) => {
                let token = &candidate[..candidate.len() - after.len()];
                match bindings.get(ns, key) {
                    Some(val) => out.push_str(val),
                    None => {
                        missing.push(token.to_string());
                        out.push_str(token);
                    }
                }
                rest = after;
            }
            Err(_) => {
                // Not a placeholder; keep the `$` and rescan from the `{`.
                out.push('$');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);

    if !missing.is_empty() {
        debug!(unresolved = missing.len(), strict, "unresolved placeholders");
        if strict {
            return Err(HiveError::UndefinedVariables(missing));
        }
    }
    Ok(out)
}

/// Parse `${ns:key}` at the start of `input`.
fn parse_placeholder(input: &str) -> IResult<&str, (Namespace, &str)> {
    delimited(
        tag("${"),
        separated_pair(parse_namespace, char(':'), parse_key),
        char('}'),
    )(input)
}

fn parse_namespace(input: &str) -> IResult<&str, Namespace> {
    alt((
        value(Namespace::Conf, tag("conf")),
        value(Namespace::Var, tag("var")),
        value(Namespace::Env, tag("env")),
    ))(input)
}

fn parse_key(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))(input)
}
