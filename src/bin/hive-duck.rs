//! hive-duck: run Hive `-e`/`-f` scripts on another SQL engine.
//!
//! # Usage
//!
//! ```bash
//! # Execute a script
//! hive-duck -f nightly.sql --hivevar dt=2024-01-01
//!
//! # Show the rewritten SQL only
//! hive-duck -e "USE sales; SELECT * FROM orders" --dry-run
//!
//! # Route USE through a database map
//! hive-duck -f report.sql -c databases.toml -o csv
//! ```

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::*;
use hive_duck::prelude::*;
use hive_duck::vars::env_snapshot;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hive-duck")]
#[command(version)]
#[command(about = "Hive-compatible -e/-f runner", long_about = None)]
#[command(after_help = "EXAMPLES:
    hive-duck -e 'SELECT 1'
    hive-duck -f etl.sql --hivevar dt=2024-01-01 --dry-run
    hive-duck -f report.sql -c databases.toml -o json")]
struct Cli {
    /// SQL string to execute (Hive: -e)
    #[arg(short = 'e', long = "execute", conflicts_with = "file")]
    execute: Option<String>,

    /// SQL file to execute (Hive: -f)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, env = "HIVE_DUCK_DATABASE_URL", default_value = "sqlite::memory:")]
    database: String,

    /// Database map file (TOML, or YAML by extension) routing USE statements
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hive conf variable k=v, referenced as ${conf:k} (repeatable)
    #[arg(long)]
    hiveconf: Vec<String>,

    /// Hive variable k=v, referenced as ${var:k} (repeatable)
    #[arg(long)]
    hivevar: Vec<String>,

    /// Fail if a referenced conf/var/env variable is missing
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    strict_vars: bool,

    /// Fail if unsupported Hive statements are detected
    #[arg(long)]
    fail_on_unsupported: bool,

    /// Print rewritten SQL without executing
    #[arg(long)]
    dry_run: bool,

    /// Suppress non-result log output (warnings about unsupported statements still print)
    #[arg(short = 'S', long)]
    silent: bool,

    /// Output format: table, csv, tsv, json
    #[arg(short, long, default_value = "table")]
    output: Format,

    /// Verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(log_filter(cli.verbose, cli.silent));

    if let Err(e) = run(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Filter used when `RUST_LOG` is unset.
fn log_filter(verbose: bool, silent: bool) -> &'static str {
    match (verbose, silent) {
        (true, _) => "hive_duck=debug",
        (false, true) => "error",
        (false, false) => "warn",
    }
}

fn init_tracing(fallback: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<()> {
    let script = match (&cli.execute, &cli.file) {
        (Some(sql), None) => sql.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("read -f file {}", path.display()))?,
        _ => bail!("exactly one of -e or -f must be provided"),
    };

    let database_map = match &cli.config {
        Some(path) => Some(DatabaseMap::load(path).context("load config")?),
        None => None,
    };

    let bindings = Bindings::from_flags(&cli.hiveconf, &cli.hivevar, env_snapshot())?;
    let translation = translate(&script, &bindings, cli.strict_vars, database_map.as_ref())?;

    if !translation.findings.is_empty() {
        report_findings(&translation.findings, &mut io::stderr().lock())?;
        if cli.fail_on_unsupported {
            return Err(HiveError::Unsupported {
                count: translation.findings.len(),
            }
            .into());
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.dry_run {
        out.write_all(translation.render().as_bytes())?;
        return Ok(());
    }

    Runner::new(&cli.database, cli.output)
        .with_database_map(database_map)
        .run(&translation.rewrite.statements, &mut out)
        .await?;
    out.flush()?;
    Ok(())
}

fn report_findings<W: Write>(findings: &[Finding], err: &mut W) -> io::Result<()> {
    for f in findings {
        writeln!(
            err,
            "{} Unsupported Hive statement: {}",
            "WARNING:".yellow().bold(),
            f.keyword.cyan()
        )?;
        writeln!(err, "  {} {}", "Statement:".dimmed(), f.statement)?;
        writeln!(err, "  {} {}", "Reason:".dimmed(), f.reason)?;
        writeln!(err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(false, false), "warn");
        assert_eq!(log_filter(false, true), "error");
        assert_eq!(log_filter(true, true), "hive_duck=debug");
    }

    #[test]
    fn test_silent_parses_alongside_execute() {
        let cli = Cli::try_parse_from(["hive-duck", "-S", "-e", "SELECT 1"]).unwrap();
        assert!(cli.silent);
        assert_eq!(cli.execute.as_deref(), Some("SELECT 1"));
        assert!(cli.strict_vars);
    }

    #[test]
    fn test_report_findings() {
        let t = translate("LOAD DATA INPATH '/x' INTO TABLE t", &Bindings::new(), true, None)
            .unwrap();
        let mut buf = Vec::new();
        report_findings(&t.findings, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Unsupported Hive statement: "), "{text}");
        assert!(text.contains("LOAD DATA"), "{text}");
        assert!(text.contains("LOAD DATA INPATH '/x' INTO TABLE t"), "{text}");
    }
}
