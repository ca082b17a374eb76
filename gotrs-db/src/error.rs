//! # Error Module
//!
//! A single error type covers every failure of the layer: schema loading,
//! rendering, driver lookup and execution. Each variant carries the table,
//! column or dialect name needed to diagnose it without re-deriving state.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors returned by schema loading, SQL rendering and statement execution.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema document is not valid YAML or does not have the expected shape.
    #[error("failed to parse schema document {source_name}: {message}")]
    Parse { source_name: String, message: String },

    /// A column names a logical type outside the recognized vocabulary.
    #[error("unknown logical type '{logical_type}' for column {table}.{column}")]
    UnknownType { table: String, column: String, logical_type: String },

    /// The schema is syntactically valid but internally inconsistent.
    #[error("schema integrity error in table '{table}': {message}")]
    SchemaIntegrity { table: String, message: String },

    /// No driver factory is registered under the requested name.
    #[error("unknown database driver '{name}'")]
    UnknownDriver { name: String },

    /// The backend could not be reached or rejected the credentials.
    #[error("{dialect}: failed to connect: {source}")]
    Connection {
        dialect: String,
        #[source]
        source: sqlx::Error,
    },

    /// A connection-bound operation was called before `connect`.
    #[error("{dialect}: driver is not connected")]
    NotConnected { dialect: String },

    /// A schema construct has no rendering in the target dialect.
    #[error("{dialect}: cannot render {table}.{column}: {message}")]
    UnsupportedSchema { dialect: String, table: String, column: String, message: String },

    /// The backend rejected or failed a rendered statement.
    #[error("{dialect}: statement failed: {source}\n  Statement: {statement}")]
    Execution {
        dialect: String,
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    /// The statement did not finish within the configured statement timeout.
    #[error("{dialect}: statement timed out after {after:?}\n  Statement: {statement}")]
    Timeout { dialect: String, statement: String, after: Duration },

    /// A table or column name cannot be used in a generated statement.
    #[error("invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// An UPDATE was requested without any column assignments.
    #[error("UPDATE on table '{table}' has no columns to set")]
    EmptyAssignment { table: String },

    /// The schema file could not be read.
    #[error("failed to read schema file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn unsupported(
        dialect: &str,
        table: &str,
        column: &str,
        message: impl Into<String>,
    ) -> Self {
        Error::UnsupportedSchema {
            dialect: dialect.to_string(),
            table: table.to_string(),
            column: column.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn integrity(table: &str, message: impl Into<String>) -> Self {
        Error::SchemaIntegrity { table: table.to_string(), message: message.into() }
    }

    pub(crate) fn execution(dialect: &str, statement: &str, source: sqlx::Error) -> Self {
        Error::Execution { dialect: dialect.to_string(), statement: statement.to_string(), source }
    }

    /// Formats the error together with its chain of causes.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
