//! SQLite driver.
//!
//! `?` placeholders, double-quoted identifiers and the rowid alias
//! `INTEGER PRIMARY KEY AUTOINCREMENT` for generated keys. SQLite only has
//! storage classes, so logical types collapse to `INTEGER`, `TEXT`, `REAL`
//! or `BLOB`. Dates and times are stored as ISO-8601 text and declared
//! `TEXT`, which keeps them readable through an `AnyRow`.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::any::AnyRow;

use super::common::{self, Syntax};
use crate::{
    config::DriverOptions,
    connection::Connection,
    driver::{Dialect, Driver, ExecResult},
    error::{Error, Result},
    identifier::{quote_double, quote_literal},
    query::{Condition, RenderedQuery, Value},
    schema::{ColumnDefinition, DefaultValue, LogicalType, TableSchema},
    transaction::Transaction,
};

const SYNTAX: Syntax = Syntax {
    dialect: "sqlite",
    quote: quote_double,
    numbered_placeholders: false,
    returning: false,
    empty_insert: "DEFAULT VALUES",
    drop_suffix: "",
    cast: common::no_cast,
};

const TABLE_EXISTS_SQL: &str = "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?";

/// Run on every new connection; SQLite leaves foreign keys off by default.
const CONNECTION_INIT: &[&str] = &["PRAGMA foreign_keys = ON"];

#[derive(Debug)]
pub struct SqliteDriver {
    conn: Connection,
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteDriver {
    pub fn new() -> Self {
        Self { conn: Connection::new(SYNTAX.dialect) }
    }

    fn column_sql(&self, schema: &TableSchema, column: &ColumnDefinition) -> Result<String> {
        common::check_auto_increment_default(&SYNTAX, schema, column)?;

        let is_pk = column.name() == schema.primary_key();
        let ty = column.logical_type();
        let name = quote_double(column.name())?;

        if ty.is_auto_increment() {
            if !is_pk {
                return Err(Error::unsupported(
                    SYNTAX.dialect,
                    schema.table_name(),
                    column.name(),
                    "AUTOINCREMENT is only supported on the INTEGER PRIMARY KEY",
                ));
            }
            return Ok(format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", name));
        }

        let mut def = format!("{} {}", name, self.native_type(ty));

        if is_pk {
            def.push_str(" PRIMARY KEY");
        } else if column.required() {
            def.push_str(" NOT NULL");
        }

        if column.unique() && !is_pk {
            def.push_str(" UNIQUE");
        }

        if let Some(default) = column.default_value() {
            def.push_str(" DEFAULT ");
            def.push_str(&self.default_sql(schema, column, default)?);
        }

        Ok(def)
    }

    fn default_sql(&self, schema: &TableSchema, column: &ColumnDefinition, default: &DefaultValue) -> Result<String> {
        if let Some(keyword) = default.keyword() {
            return Ok(keyword.to_string());
        }

        Ok(match default {
            DefaultValue::Bool(true) => "1".to_string(),
            DefaultValue::Bool(false) => "0".to_string(),
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Float(f) => common::check_float(&SYNTAX, schema, column, *f)?,
            DefaultValue::Text(text) => quote_literal(text),
        })
    }
}

/// In-memory databases exist per connection, so the pool must hold exactly one.
fn is_in_memory(endpoint: &str) -> bool {
    endpoint.contains(":memory:") || endpoint.contains("mode=memory")
}

/// Pins the single connection holding an in-memory database: closing it
/// would discard every table.
fn in_memory_options(options: DriverOptions) -> DriverOptions {
    options.max_connections(1).min_connections(1).idle_timeout(None).max_lifetime(None)
}

#[async_trait]
impl Driver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn configure(&mut self, options: DriverOptions) {
        self.conn.set_options(options);
    }

    fn options(&self) -> DriverOptions {
        self.conn.options()
    }

    async fn connect(&mut self, endpoint: &str) -> Result<()> {
        let mut options = self.conn.options();
        if is_in_memory(endpoint) {
            options = in_memory_options(options);
        }
        self.conn.connect(endpoint, options, CONNECTION_INIT).await
    }

    async fn close(&mut self) -> Result<()> {
        self.conn.close().await
    }

    fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    async fn ping(&self) -> Result<()> {
        self.conn.ping().await
    }

    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        self.conn.exec(sql, args).await
    }

    async fn fetch_all(&self, sql: &str, args: &[Value]) -> Result<Vec<AnyRow>> {
        self.conn.fetch_all(sql, args).await
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        self.conn.probe_exists(TABLE_EXISTS_SQL, table).await
    }

    async fn begin(&self) -> Result<Transaction> {
        self.conn.begin().await
    }

    fn quote_ident(&self, name: &str) -> Result<String> {
        SYNTAX.quote(name)
    }

    fn create_table(&self, schema: &TableSchema) -> Result<RenderedQuery> {
        let columns = schema
            .effective_columns()
            .iter()
            .map(|column| self.column_sql(schema, column))
            .collect::<Result<Vec<_>>>()?;
        common::create_table(&SYNTAX, schema, columns, "")
    }

    fn create_indexes(&self, schema: &TableSchema) -> Result<Vec<RenderedQuery>> {
        common::create_indexes(&SYNTAX, schema)
    }

    fn drop_table(&self, table: &str) -> Result<RenderedQuery> {
        common::drop_table(&SYNTAX, table)
    }

    fn insert(&self, table: &str, values: &HashMap<String, Value>) -> Result<RenderedQuery> {
        common::insert(&SYNTAX, table, values)
    }

    fn insert_returning(&self, table: &str, values: &HashMap<String, Value>, returning: &[&str]) -> Result<RenderedQuery> {
        common::insert_returning(&SYNTAX, table, values, returning)
    }

    fn update(&self, table: &str, values: &HashMap<String, Value>, conditions: &[Condition]) -> Result<RenderedQuery> {
        common::update(&SYNTAX, table, values, conditions)
    }

    fn delete(&self, table: &str, conditions: &[Condition]) -> Result<RenderedQuery> {
        common::delete(&SYNTAX, table, conditions)
    }

    fn select(&self, table: &str, columns: &[&str], conditions: &[Condition]) -> Result<RenderedQuery> {
        common::select(&SYNTAX, table, columns, conditions)
    }

    fn native_type(&self, logical_type: LogicalType) -> String {
        let ty = match logical_type {
            LogicalType::Varchar(_) | LogicalType::Char(_) | LogicalType::Text => "TEXT",
            LogicalType::Json | LogicalType::Uuid => "TEXT",
            LogicalType::Timestamp | LogicalType::Date | LogicalType::Time => "TEXT",
            LogicalType::SmallInt
            | LogicalType::Integer
            | LogicalType::BigInt
            | LogicalType::Serial
            | LogicalType::BigSerial
            | LogicalType::Boolean => "INTEGER",
            LogicalType::Blob => "BLOB",
            LogicalType::Real | LogicalType::Double => "REAL",
        };
        ty.to_string()
    }

    /// SQLite accepts any declared type; unknown names become `TEXT`.
    fn fallback_type(&self, _logical_type: &str) -> String {
        "TEXT".to_string()
    }

    fn supports_returning(&self) -> bool {
        false
    }

    fn supports_last_insert_id(&self) -> bool {
        true
    }

    fn supports_arrays(&self) -> bool {
        false
    }
}
