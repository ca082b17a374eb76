//! Identifier validation and quoting.
//!
//! Table and column names cannot be bound as statement parameters, so every
//! generated statement quotes them. Names are validated first (empty, NUL
//! bytes, length), then wrapped in the dialect's quote character with any
//! embedded quote character doubled.

use crate::error::{Error, Result};

/// PostgreSQL truncates identifiers longer than 63 bytes; MySQL rejects
/// anything above 64. 63 is safe for every supported backend.
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Validates a table or column name.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "identifier cannot be empty"));
    }

    if name.contains('\0') {
        return Err(invalid(name, "identifier contains a null byte"));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(invalid(
            name,
            format!("identifier exceeds {} bytes (got {})", MAX_IDENTIFIER_LENGTH, name.len()),
        ));
    }

    Ok(())
}

fn invalid(name: &str, reason: impl Into<String>) -> Error {
    Error::InvalidIdentifier { name: name.to_string(), reason: reason.into() }
}

/// Quotes with double quotes (PostgreSQL, SQLite).
pub fn quote_double(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quotes with backticks (MySQL, MariaDB).
pub fn quote_backtick(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Renders a standard SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Renders a MySQL string literal. Backslash is an escape character there
/// unless `NO_BACKSLASH_ESCAPES` is set, so it is doubled as well.
pub fn quote_literal_mysql(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}
