//! Error types for hive-duck.

use thiserror::Error;

/// The main error type for hive-duck operations.
#[derive(Debug, Error)]
pub enum HiveError {
    /// One or more `${ns:key}` placeholders had no binding under strict mode.
    #[error("undefined variable(s): {}", .0.join(", "))]
    UndefinedVariables(Vec<String>),

    /// Script ended inside a quoted literal, quoted identifier or block comment.
    #[error("unterminated quote or comment in SQL input")]
    Unterminated,

    /// `USE` named a database that the database map does not know.
    #[error("database '{name}' not found in config (available: {})", .available.join(", "))]
    UnmappedDatabase { name: String, available: Vec<String> },

    /// Raised by callers that escalate detector findings.
    #[error(
        "found {count} unsupported Hive statement(s); drop --fail-on-unsupported to continue anyway"
    )]
    Unsupported { count: usize },

    /// A `--hiveconf`/`--hivevar` entry was not `key=value`.
    #[error("{flag}: expected key=value, got '{input}'")]
    InvalidBinding { flag: &'static str, input: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution error.
    #[error("Execution error: {message}\nSQL: {sql}")]
    Execution { message: String, sql: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HiveError {
    /// Create an execution error for the given statement.
    pub fn execution(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            sql: sql.into(),
        }
    }
}

/// Result type alias for hive-duck operations.
pub type HiveResult<T> = Result<T, HiveError>;
