//! # Schema Module
//!
//! The driver-agnostic description of a table. Values in this module are
//! produced by the loader, validated once, and never mutated afterwards;
//! drivers only read them when rendering SQL.

use std::fmt;

/// Name of the implicit creation timestamp column.
pub const CREATE_TIME_COLUMN: &str = "create_time";

/// Name of the implicit modification timestamp column.
pub const CHANGE_TIME_COLUMN: &str = "change_time";

// ============================================================================
// Logical Types
// ============================================================================

/// Abstract column type, independent of any dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Varchar(u32),
    Char(u32),
    Text,
    SmallInt,
    Integer,
    BigInt,
    Serial,
    BigSerial,
    Boolean,
    Timestamp,
    Date,
    Time,
    Json,
    Uuid,
    Blob,
    Real,
    Double,
}

impl LogicalType {
    /// Parses a logical type name, case-insensitively and accepting the usual aliases
    /// (`int`, `bool`, `bytea`, `float`, `jsonb`, `datetime`, `character(n)`).
    ///
    /// Returns `None` for anything outside the vocabulary, including a
    /// `varchar` without a length.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();

        if let Some(rest) = name.strip_prefix("varchar") {
            return parse_length(rest).map(LogicalType::Varchar);
        }
        if let Some(rest) = name.strip_prefix("character") {
            return parse_length(rest).map(LogicalType::Char);
        }
        if let Some(rest) = name.strip_prefix("char") {
            return parse_length(rest).map(LogicalType::Char);
        }

        let ty = match name.as_str() {
            "text" => LogicalType::Text,
            "smallint" => LogicalType::SmallInt,
            "int" | "integer" => LogicalType::Integer,
            "bigint" => LogicalType::BigInt,
            "serial" => LogicalType::Serial,
            "bigserial" => LogicalType::BigSerial,
            "bool" | "boolean" => LogicalType::Boolean,
            "timestamp" | "datetime" => LogicalType::Timestamp,
            "date" => LogicalType::Date,
            "time" => LogicalType::Time,
            "json" | "jsonb" => LogicalType::Json,
            "uuid" => LogicalType::Uuid,
            "blob" | "bytea" => LogicalType::Blob,
            "real" | "float" => LogicalType::Real,
            "double" => LogicalType::Double,
            _ => return None,
        };
        Some(ty)
    }

    /// Whether the backend generates values for this column on insert.
    pub fn is_auto_increment(&self) -> bool {
        matches!(self, LogicalType::Serial | LogicalType::BigSerial)
    }

    /// Whether MySQL refuses literal defaults for this type.
    pub(crate) fn is_large_object(&self) -> bool {
        matches!(self, LogicalType::Text | LogicalType::Blob | LogicalType::Json)
    }
}

/// Parses a `(n)` length suffix with `n >= 1`.
fn parse_length(rest: &str) -> Option<u32> {
    let inner = rest.trim().strip_prefix('(')?.strip_suffix(')')?.trim();
    match inner.parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Varchar(n) => write!(f, "varchar({})", n),
            LogicalType::Char(n) => write!(f, "char({})", n),
            LogicalType::Text => f.write_str("text"),
            LogicalType::SmallInt => f.write_str("smallint"),
            LogicalType::Integer => f.write_str("integer"),
            LogicalType::BigInt => f.write_str("bigint"),
            LogicalType::Serial => f.write_str("serial"),
            LogicalType::BigSerial => f.write_str("bigserial"),
            LogicalType::Boolean => f.write_str("boolean"),
            LogicalType::Timestamp => f.write_str("timestamp"),
            LogicalType::Date => f.write_str("date"),
            LogicalType::Time => f.write_str("time"),
            LogicalType::Json => f.write_str("json"),
            LogicalType::Uuid => f.write_str("uuid"),
            LogicalType::Blob => f.write_str("blob"),
            LogicalType::Real => f.write_str("real"),
            LogicalType::Double => f.write_str("double"),
        }
    }
}

// ============================================================================
// Default Values
// ============================================================================

/// SQL keywords accepted as defaults and rendered unquoted.
const KEYWORD_DEFAULTS: [&str; 3] = ["CURRENT_TIMESTAMP", "CURRENT_DATE", "CURRENT_TIME"];

/// A column default as written in the schema document.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl DefaultValue {
    /// Returns the upper-cased keyword when this default is `CURRENT_TIMESTAMP`,
    /// `CURRENT_DATE` or `CURRENT_TIME` (in any case).
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            DefaultValue::Text(text) => {
                let upper = text.trim().to_ascii_uppercase();
                KEYWORD_DEFAULTS.into_iter().find(|k| *k == upper)
            }
            _ => None,
        }
    }
}

// ============================================================================
// Columns and Tables
// ============================================================================

/// A single column of a [`TableSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    name: String,
    logical_type: LogicalType,
    required: bool,
    unique: bool,
    default_value: Option<DefaultValue>,
}

impl ColumnDefinition {
    pub fn new(
        name: impl Into<String>,
        logical_type: LogicalType,
        required: bool,
        unique: bool,
        default_value: Option<DefaultValue>,
    ) -> Self {
        Self { name: name.into(), logical_type, required, unique, default_value }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logical_type(&self) -> LogicalType {
        self.logical_type
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn unique(&self) -> bool {
        self.unique
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default_value.as_ref()
    }

    fn timestamp(name: &str) -> Self {
        Self::new(
            name,
            LogicalType::Timestamp,
            true,
            false,
            Some(DefaultValue::Text("CURRENT_TIMESTAMP".to_string())),
        )
    }
}

/// A validated table definition.
///
/// Built by [`SchemaRegistry`](crate::SchemaRegistry) and immutable afterwards,
/// so rendering the same schema always yields the same SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    table_name: String,
    primary_key: String,
    columns: Vec<ColumnDefinition>,
    has_timestamps: bool,
    indexes: Vec<String>,
}

impl TableSchema {
    /// Assembles a schema. The loader validates the parts before calling this.
    pub(crate) fn new(
        table_name: String,
        primary_key: String,
        columns: Vec<ColumnDefinition>,
        has_timestamps: bool,
        indexes: Vec<String>,
    ) -> Self {
        Self { table_name, primary_key, columns, has_timestamps, indexes }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// The explicitly declared columns, in document order.
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn has_timestamps(&self) -> bool {
        self.has_timestamps
    }

    /// Columns that get a secondary index, in document order.
    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    /// Name of the secondary index on `column`: `idx_<table>_<column>`,
    /// with both names taken verbatim.
    ///
    /// Index names share one namespace per database, so the loader rejects
    /// schemas where two indexes would get the same name.
    pub fn index_name(&self, column: &str) -> String {
        format!("idx_{}_{}", self.table_name, column)
    }

    /// Looks up an explicit column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key_column(&self) -> Option<&ColumnDefinition> {
        self.column(&self.primary_key)
    }

    /// Explicit columns followed by the implicit `create_time` / `change_time`
    /// columns when timestamps are enabled.
    ///
    /// An implicit column is omitted when an explicit column already uses its name.
    pub fn effective_columns(&self) -> Vec<ColumnDefinition> {
        let mut columns = self.columns.clone();
        if self.has_timestamps {
            for name in [CREATE_TIME_COLUMN, CHANGE_TIME_COLUMN] {
                if self.column(name).is_none() {
                    columns.push(ColumnDefinition::timestamp(name));
                }
            }
        }
        columns
    }

    /// Number of columns the rendered table has.
    pub fn column_count(&self) -> usize {
        let implicit = if self.has_timestamps {
            [CREATE_TIME_COLUMN, CHANGE_TIME_COLUMN]
                .into_iter()
                .filter(|name| self.column(name).is_none())
                .count()
        } else {
            0
        };
        self.columns.len() + implicit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parameterized_types() {
        assert_eq!(LogicalType::parse("varchar(200)"), Some(LogicalType::Varchar(200)));
        assert_eq!(LogicalType::parse("VARCHAR( 36 )"), Some(LogicalType::Varchar(36)));
        assert_eq!(LogicalType::parse("character(2)"), Some(LogicalType::Char(2)));
        assert_eq!(LogicalType::parse("char(1)"), Some(LogicalType::Char(1)));
    }

    #[test]
    fn test_parse_rejects_missing_or_zero_length() {
        assert_eq!(LogicalType::parse("varchar"), None);
        assert_eq!(LogicalType::parse("varchar(0)"), None);
        assert_eq!(LogicalType::parse("varchar(abc)"), None);
        assert_eq!(LogicalType::parse("char"), None);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(LogicalType::parse("INT"), Some(LogicalType::Integer));
        assert_eq!(LogicalType::parse("bool"), Some(LogicalType::Boolean));
        assert_eq!(LogicalType::parse("bytea"), Some(LogicalType::Blob));
        assert_eq!(LogicalType::parse("float"), Some(LogicalType::Real));
        assert_eq!(LogicalType::parse("jsonb"), Some(LogicalType::Json));
        assert_eq!(LogicalType::parse("datetime"), Some(LogicalType::Timestamp));
        assert_eq!(LogicalType::parse("geometry"), None);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for ty in [LogicalType::Varchar(10), LogicalType::Char(3), LogicalType::BigSerial, LogicalType::Double] {
            assert_eq!(LogicalType::parse(&ty.to_string()), Some(ty));
        }
    }

    #[test]
    fn test_keyword_defaults() {
        assert_eq!(DefaultValue::Text("current_timestamp".into()).keyword(), Some("CURRENT_TIMESTAMP"));
        assert_eq!(DefaultValue::Text("CURRENT_DATE".into()).keyword(), Some("CURRENT_DATE"));
        assert_eq!(DefaultValue::Text("CURRENT_USER".into()).keyword(), None);
        assert_eq!(DefaultValue::Int(1).keyword(), None);
    }

    #[test]
    fn test_effective_columns_adds_timestamps_once() {
        let schema = TableSchema::new(
            "ticket".into(),
            "id".into(),
            vec![
                ColumnDefinition::new("id", LogicalType::Serial, false, false, None),
                ColumnDefinition::new("create_time", LogicalType::Timestamp, true, false, None),
            ],
            true,
            Vec::new(),
        );

        let names: Vec<String> = schema.effective_columns().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["id", "create_time", "change_time"]);
        assert_eq!(schema.column_count(), 3);
    }
}
