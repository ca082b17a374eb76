//! PostgreSQL driver.
//!
//! Numbered placeholders (`$1`), double-quoted identifiers and `SERIAL` /
//! `BIGSERIAL` for generated keys. Generated values come back through
//! [`Driver::insert_returning`] rather than `last_insert_id`.
//!
//! PostgreSQL does not coerce text parameters into date/time, UUID or JSON
//! columns, so placeholders of text-bound values carry an explicit cast.
//! Reading those columns through [`Driver::fetch_all`] needs a `::TEXT` cast
//! in the projection, since the `Any` row cannot decode them.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::any::AnyRow;

use super::common::{self, Syntax};
use crate::{
    config::DriverOptions,
    connection::Connection,
    driver::{Dialect, Driver, ExecResult},
    error::Result,
    identifier::{quote_double, quote_literal},
    query::{Condition, RenderedQuery, Value},
    schema::{ColumnDefinition, DefaultValue, LogicalType, TableSchema},
    transaction::Transaction,
};

const SYNTAX: Syntax = Syntax {
    dialect: "postgres",
    quote: quote_double,
    numbered_placeholders: true,
    returning: true,
    empty_insert: "DEFAULT VALUES",
    drop_suffix: " CASCADE",
    cast: placeholder_cast,
};

fn placeholder_cast(ty: LogicalType) -> Option<&'static str> {
    match ty {
        LogicalType::Timestamp => Some("TIMESTAMP"),
        LogicalType::Date => Some("DATE"),
        LogicalType::Time => Some("TIME"),
        LogicalType::Uuid => Some("UUID"),
        LogicalType::Json => Some("JSONB"),
        _ => None,
    }
}

const TABLE_EXISTS_SQL: &str = "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
     WHERE table_schema = current_schema() AND table_name = $1)";

#[derive(Debug)]
pub struct PostgresDriver {
    conn: Connection,
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresDriver {
    pub fn new() -> Self {
        Self { conn: Connection::new(SYNTAX.dialect) }
    }

    fn column_sql(&self, schema: &TableSchema, column: &ColumnDefinition) -> Result<String> {
        common::check_auto_increment_default(&SYNTAX, schema, column)?;

        let is_pk = column.name() == schema.primary_key();
        let mut def = format!("{} {}", quote_double(column.name())?, self.native_type(column.logical_type()));

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
            DefaultValue::Bool(true) => "TRUE".to_string(),
            DefaultValue::Bool(false) => "FALSE".to_string(),
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Float(f) => common::check_float(&SYNTAX, schema, column, *f)?,
            DefaultValue::Text(text) => quote_literal(text),
        })
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn configure(&mut self, options: DriverOptions) {
        self.conn.set_options(options);
    }

    fn options(&self) -> DriverOptions {
        self.conn.options()
    }

    async fn connect(&mut self, endpoint: &str) -> Result<()> {
        let options = self.conn.options();
        self.conn.connect(endpoint, options, &[]).await
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
        match logical_type {
            LogicalType::Varchar(n) => format!("VARCHAR({})", n),
            LogicalType::Char(n) => format!("CHAR({})", n),
            LogicalType::Text => "TEXT".to_string(),
            LogicalType::SmallInt => "SMALLINT".to_string(),
            LogicalType::Integer => "INTEGER".to_string(),
            LogicalType::BigInt => "BIGINT".to_string(),
            LogicalType::Serial => "SERIAL".to_string(),
            LogicalType::BigSerial => "BIGSERIAL".to_string(),
            LogicalType::Boolean => "BOOLEAN".to_string(),
            LogicalType::Timestamp => "TIMESTAMP".to_string(),
            LogicalType::Date => "DATE".to_string(),
            LogicalType::Time => "TIME".to_string(),
            LogicalType::Json => "JSONB".to_string(),
            LogicalType::Uuid => "UUID".to_string(),
            LogicalType::Blob => "BYTEA".to_string(),
            LogicalType::Real => "REAL".to_string(),
            LogicalType::Double => "DOUBLE PRECISION".to_string(),
        }
    }

    /// Passes the name through upper-cased, `TEXT` when blank.
    fn fallback_type(&self, logical_type: &str) -> String {
        common::uppercase_fallback(logical_type)
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn supports_last_insert_id(&self) -> bool {
        false
    }

    fn supports_arrays(&self) -> bool {
        true
    }
}
