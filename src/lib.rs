//! # hive-duck
//!
//! Translate Hive-dialect SQL scripts into statements another engine can run.
//!
//! A script goes through four stages:
//!
//! | Stage        | Module                         | Output                         |
//! |--------------|--------------------------------|--------------------------------|
//! | Substitute   | [`subst`]                      | script with `${ns:key}` filled |
//! | Split        | [`split`]                      | ordered statements             |
//! | Detect       | [`unsupported`]                | advisory findings              |
//! | Rewrite      | [`rewrite`]                    | executable statements          |
//!
//! ## Quick Example
//!
//! ```
//! use hive_duck::prelude::*;
//!
//! let vars = Bindings::new().with(Namespace::Var, "db", "sales");
//! let t = hive_duck::translate(
//!     "SET hive.exec.parallel=true; USE ${var:db}; SELECT 1;",
//!     &vars,
//!     true,
//!     None,
//! )
//! .unwrap();
//!
//! assert_eq!(
//!     t.rewrite.statements,
//!     vec![
//!         "CREATE SCHEMA IF NOT EXISTS sales",
//!         "SET search_path = 'sales'",
//!         "SELECT 1",
//!     ]
//! );
//! assert_eq!(t.rewrite.set_vars["hive.exec.parallel"], "true");
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod rewrite;
pub mod split;
pub mod subst;
pub mod unsupported;
pub mod vars;

use tracing::debug;

use crate::config::DatabaseMap;
use crate::error::HiveResult;
use crate::rewrite::RewriteResult;
use crate::unsupported::Finding;
use crate::vars::Bindings;

pub mod prelude {
    pub use crate::config::DatabaseMap;
    pub use crate::engine::Runner;
    pub use crate::error::*;
    pub use crate::output::{Format, ResultSet};
    pub use crate::rewrite::{RewriteResult, rewrite};
    pub use crate::split::split_statements;
    pub use crate::subst::substitute;
    pub use crate::unsupported::{Finding, detect_unsupported};
    pub use crate::vars::{Bindings, Namespace};
    pub use crate::{Translation, translate};
}

/// Everything produced from one script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    /// Advisory findings; they do not affect `rewrite`.
    pub findings: Vec<Finding>,
    pub rewrite: RewriteResult,
}

impl Translation {
    /// Dry-run text: one statement per line, each terminated by `;`.
    pub fn render(&self) -> String {
        self.rewrite
            .statements
            .iter()
            .map(|stmt| format!("{};\n", stmt))
            .collect()
    }
}

/// Run substitute, split, detect and rewrite over `script`.
pub fn translate(
    script: &str,
    bindings: &Bindings,
    strict: bool,
    database_map: Option<&DatabaseMap>,
) -> HiveResult<Translation> {
    let substituted = subst::substitute(script, bindings, strict)?;
    let stmts = split::split_statements(&substituted)?;
    let findings = unsupported::detect_unsupported(&stmts);
    let rewrite = rewrite::rewrite(&stmts, database_map)?;

    debug!(
        input_statements = stmts.len(),
        output_statements = rewrite.statements.len(),
        findings = findings.len(),
        "translated script"
    );
    Ok(Translation { findings, rewrite })
}
