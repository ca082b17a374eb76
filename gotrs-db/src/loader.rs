//! # Schema Loader
//!
//! Parses declarative table documents into [`TableSchema`] values and keeps
//! them in a [`SchemaRegistry`] keyed by table name.
//!
//! A document is a YAML mapping of table names to table definitions:
//!
//! ```yaml
//! ticket:
//!   pk: id
//!   columns:
//!     id: serial
//!     title: { type: varchar(255), required: true }
//!     tn: { type: varchar(50), required: true, unique: true }
//!     archive_flag: { type: smallint, default: 0 }
//!   timestamps: true
//!   indexes: [title]
//! ```
//!
//! A column is either a bare type name or a mapping with `type`, `required`,
//! `unique` and `default`. `pk` defaults to `id`. JSON documents are accepted
//! as well, since JSON is a subset of YAML.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::{Error, Result};
use crate::identifier::validate_identifier;
use crate::schema::{ColumnDefinition, DefaultValue, LogicalType, TableSchema};

/// Primary key column assumed when a table omits `pk`.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

// ============================================================================
// Document Shapes
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableDocument {
    #[serde(default)]
    pk: Option<String>,
    columns: Mapping,
    #[serde(default)]
    timestamps: bool,
    #[serde(default)]
    indexes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnDocument {
    #[serde(rename = "type")]
    logical_type: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    default: Option<YamlValue>,
}

// ============================================================================
// Schema Registry
// ============================================================================

/// Owns every loaded [`TableSchema`], keyed by table name.
///
/// Loading a table that already exists replaces the previous definition.
/// Tables are never removed.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, TableSchema>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every table defined in `document`.
    ///
    /// The document is parsed and validated completely before the registry is
    /// touched, so a failing document leaves the registry as it was.
    pub fn load_from_str(&mut self, document: &str) -> Result<()> {
        self.load_document(document, "<string>")
    }

    /// Reads `path` and loads it like [`load_from_str`](Self::load_from_str).
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        self.load_document(&content, &path.display().to_string())
    }

    fn load_document(&mut self, document: &str, source_name: &str) -> Result<()> {
        let tables = parse_document(document, source_name)?;
        self.check_index_names(&tables)?;
        let count = tables.len();

        for table in tables {
            if self.tables.contains_key(table.table_name()) {
                log::debug!("replacing schema for table '{}'", table.table_name());
            }
            self.tables.insert(table.table_name().to_string(), table);
        }

        log::info!("loaded {} table schema(s) from {}", count, source_name);
        Ok(())
    }

    /// Rejects index names that collide with another index, in the incoming
    /// document or in tables it does not replace.
    fn check_index_names(&self, incoming: &[TableSchema]) -> Result<()> {
        let replaced: HashSet<&str> = incoming.iter().map(|t| t.table_name()).collect();
        let kept = self.tables.values().filter(|t| !replaced.contains(t.table_name()));

        let mut owners: HashMap<String, &str> = HashMap::new();
        for table in kept.chain(incoming.iter()) {
            for column in table.indexes() {
                let name = table.index_name(column);
                if let Some(owner) = owners.insert(name.clone(), table.table_name()) {
                    return Err(Error::integrity(
                        table.table_name(),
                        format!("index name '{}' on column '{}' is already used by table '{}'", name, column, owner),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Returns the schema loaded under exactly `table_name`.
    pub fn get_schema(&self, table_name: &str) -> Option<&TableSchema> {
        self.tables.get(table_name)
    }

    /// Loaded table names in lexicographic order.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Loaded tables ordered by name.
    pub fn tables(&self) -> Vec<&TableSchema> {
        self.table_names().into_iter().filter_map(|name| self.tables.get(name)).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

// ============================================================================
// Parsing and Validation
// ============================================================================

fn parse_error(source_name: &str, message: impl Into<String>) -> Error {
    Error::Parse { source_name: source_name.to_string(), message: message.into() }
}

/// Parses a whole document into validated schemas, in document order.
fn parse_document(document: &str, source_name: &str) -> Result<Vec<TableSchema>> {
    let root: YamlValue =
        serde_yaml::from_str(document).map_err(|e| parse_error(source_name, e.to_string()))?;

    let mapping = match root {
        YamlValue::Null => return Ok(Vec::new()),
        YamlValue::Mapping(mapping) => mapping,
        _ => return Err(parse_error(source_name, "expected a mapping of table names to definitions")),
    };

    let mut tables = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let table_name = key
            .as_str()
            .ok_or_else(|| parse_error(source_name, format!("table name must be a string, got {:?}", key)))?
            .to_string();

        let table_doc: TableDocument = serde_yaml::from_value(value)
            .map_err(|e| parse_error(source_name, format!("table '{}': {}", table_name, e)))?;

        tables.push(build_table(table_name, table_doc, source_name)?);
    }

    Ok(tables)
}

fn build_table(table_name: String, doc: TableDocument, source_name: &str) -> Result<TableSchema> {
    validate_identifier(&table_name).map_err(|e| Error::integrity(&table_name, e.to_string()))?;

    if doc.columns.is_empty() {
        return Err(Error::integrity(&table_name, "table declares no columns"));
    }

    let mut columns = Vec::with_capacity(doc.columns.len());
    for (key, value) in doc.columns {
        let column_name = key
            .as_str()
            .ok_or_else(|| {
                parse_error(source_name, format!("table '{}': column name must be a string, got {:?}", table_name, key))
            })?
            .to_string();

        validate_identifier(&column_name).map_err(|e| Error::integrity(&table_name, e.to_string()))?;
        columns.push(build_column(&table_name, column_name, value, source_name)?);
    }

    let primary_key = doc.pk.unwrap_or_else(|| DEFAULT_PRIMARY_KEY.to_string());
    if !columns.iter().any(|c| c.name() == primary_key) {
        return Err(Error::integrity(
            &table_name,
            format!("primary key '{}' does not name a declared column", primary_key),
        ));
    }

    let mut seen = HashSet::new();
    let mut indexes = Vec::with_capacity(doc.indexes.len());
    for index in doc.indexes {
        if !columns.iter().any(|c| c.name() == index) {
            return Err(Error::integrity(
                &table_name,
                format!("index on '{}' does not name a declared column", index),
            ));
        }
        if seen.insert(index.clone()) {
            indexes.push(index);
        }
    }

    let schema = TableSchema::new(table_name, primary_key, columns, doc.timestamps, indexes);
    for column in schema.indexes() {
        validate_identifier(&schema.index_name(column)).map_err(|e| {
            Error::integrity(schema.table_name(), format!("index on '{}' cannot be named: {}", column, e))
        })?;
    }

    Ok(schema)
}

fn build_column(table_name: &str, column_name: String, value: YamlValue, source_name: &str) -> Result<ColumnDefinition> {
    let doc = match value {
        YamlValue::String(logical_type) => {
            ColumnDocument { logical_type, required: false, unique: false, default: None }
        }
        other => serde_yaml::from_value(other).map_err(|e| {
            parse_error(source_name, format!("column {}.{}: {}", table_name, column_name, e))
        })?,
    };

    let logical_type = LogicalType::parse(&doc.logical_type).ok_or_else(|| Error::UnknownType {
        table: table_name.to_string(),
        column: column_name.clone(),
        logical_type: doc.logical_type.clone(),
    })?;

    let default_value = match doc.default {
        None => None,
        Some(value) => convert_default(value).map_err(|message| {
            parse_error(source_name, format!("column {}.{}: {}", table_name, column_name, message))
        })?,
    };

    Ok(ColumnDefinition::new(column_name, logical_type, doc.required, doc.unique, default_value))
}

fn convert_default(value: YamlValue) -> std::result::Result<Option<DefaultValue>, String> {
    match value {
        YamlValue::Null => Ok(None),
        YamlValue::Bool(b) => Ok(Some(DefaultValue::Bool(b))),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(DefaultValue::Int(i)))
            } else if let Some(f) = n.as_f64() {
                Ok(Some(DefaultValue::Float(f)))
            } else {
                Err(format!("default {} is out of range", n))
            }
        }
        YamlValue::String(s) => Ok(Some(DefaultValue::Text(s))),
        other => Err(format!("default must be a scalar, got {:?}", other)),
    }
}
