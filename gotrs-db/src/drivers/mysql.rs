//! MySQL / MariaDB driver.
//!
//! `?` placeholders, backtick identifiers, `AUTO_INCREMENT` keys and no
//! RETURNING clause; generated keys come back through
//! [`ExecResult::last_insert_id`]. Secondary indexes are declared inline in
//! `CREATE TABLE`, since MySQL has no `CREATE INDEX IF NOT EXISTS`.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::any::AnyRow;

use super::common::{self, Syntax};
use crate::{
    config::DriverOptions,
    connection::Connection,
    driver::{Dialect, Driver, ExecResult},
    error::{Error, Result},
    identifier::{quote_backtick, quote_literal_mysql},
    query::{Condition, RenderedQuery, Value},
    schema::{ColumnDefinition, DefaultValue, LogicalType, TableSchema, CHANGE_TIME_COLUMN},
    transaction::Transaction,
};

const SYNTAX: Syntax = Syntax {
    dialect: "mysql",
    quote: quote_backtick,
    numbered_placeholders: false,
    returning: false,
    empty_insert: "() VALUES ()",
    drop_suffix: "",
    cast: common::no_cast,
};

const TABLE_SUFFIX: &str = " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci";

const TABLE_EXISTS_SQL: &str =
    "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?";

#[derive(Debug)]
pub struct MySqlDriver {
    conn: Connection,
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlDriver {
    pub fn new() -> Self {
        Self { conn: Connection::new(SYNTAX.dialect) }
    }

    fn column_sql(&self, schema: &TableSchema, column: &ColumnDefinition) -> Result<String> {
        common::check_auto_increment_default(&SYNTAX, schema, column)?;

        let is_pk = column.name() == schema.primary_key();
        let ty = column.logical_type();
        if ty.is_auto_increment() && !is_pk {
            return Err(Error::unsupported(
                SYNTAX.dialect,
                schema.table_name(),
                column.name(),
                "AUTO_INCREMENT is only supported on the primary key",
            ));
        }

        let mut def = format!("{} {}", quote_backtick(column.name())?, self.native_type(ty));

        if ty.is_auto_increment() {
            def.push_str(" AUTO_INCREMENT");
        }

        if is_pk {
            def.push_str(" PRIMARY KEY");
        } else if column.required() {
            def.push_str(" NOT NULL");
        }

        if column.unique() && !is_pk {
            check_keyable(schema, column, "UNIQUE")?;
            def.push_str(" UNIQUE");
        }

        if let Some(default) = column.default_value() {
            def.push_str(" DEFAULT ");
            def.push_str(&self.default_sql(schema, column, default)?);
        }

        let implicit_change_time = schema.has_timestamps()
            && column.name() == CHANGE_TIME_COLUMN
            && schema.column(CHANGE_TIME_COLUMN).is_none();
        if implicit_change_time {
            def.push_str(" ON UPDATE CURRENT_TIMESTAMP");
        }

        Ok(def)
    }

    fn default_sql(&self, schema: &TableSchema, column: &ColumnDefinition, default: &DefaultValue) -> Result<String> {
        if let Some(keyword) = default.keyword() {
            if keyword == "CURRENT_TIMESTAMP" && column.logical_type() == LogicalType::Timestamp {
                return Ok(keyword.to_string());
            }
            return Err(Error::unsupported(
                SYNTAX.dialect,
                schema.table_name(),
                column.name(),
                format!("{} default is only supported as CURRENT_TIMESTAMP on timestamp columns", keyword),
            ));
        }

        if column.logical_type().is_large_object() {
            return Err(Error::unsupported(
                SYNTAX.dialect,
                schema.table_name(),
                column.name(),
                format!("{} columns cannot have a literal default", self.native_type(column.logical_type())),
            ));
        }

        Ok(match default {
            DefaultValue::Bool(true) => "1".to_string(),
            DefaultValue::Bool(false) => "0".to_string(),
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Float(f) => common::check_float(&SYNTAX, schema, column, *f)?,
            DefaultValue::Text(text) => quote_literal_mysql(text),
        })
    }
}

/// TEXT, BLOB and JSON columns cannot be keyed without a prefix length.
fn check_keyable(schema: &TableSchema, column: &ColumnDefinition, key: &str) -> Result<()> {
    if column.logical_type().is_large_object() {
        return Err(Error::unsupported(
            SYNTAX.dialect,
            schema.table_name(),
            column.name(),
            format!("{} is not supported on {} columns", key, column.logical_type()),
        ));
    }
    Ok(())
}

#[async_trait]
impl Driver for MySqlDriver {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
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
        let mut elements = schema
            .effective_columns()
            .iter()
            .map(|column| self.column_sql(schema, column))
            .collect::<Result<Vec<_>>>()?;

        for name in schema.indexes() {
            if let Some(column) = schema.column(name) {
                check_keyable(schema, column, "INDEX")?;
            }
            elements.push(format!(
                "INDEX {} ({})",
                quote_backtick(&schema.index_name(name))?,
                quote_backtick(name)?
            ));
        }

        common::create_table(&SYNTAX, schema, elements, TABLE_SUFFIX)
    }

    /// Always empty: indexes are part of [`create_table`](Driver::create_table).
    fn create_indexes(&self, _schema: &TableSchema) -> Result<Vec<RenderedQuery>> {
        Ok(Vec::new())
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
            LogicalType::Integer | LogicalType::Serial => "INT".to_string(),
            LogicalType::BigInt | LogicalType::BigSerial => "BIGINT".to_string(),
            LogicalType::Boolean => "TINYINT(1)".to_string(),
            LogicalType::Timestamp => "TIMESTAMP".to_string(),
            LogicalType::Date => "DATE".to_string(),
            LogicalType::Time => "TIME".to_string(),
            LogicalType::Json => "JSON".to_string(),
            LogicalType::Uuid => "VARCHAR(36)".to_string(),
            LogicalType::Blob => "BLOB".to_string(),
            LogicalType::Real => "FLOAT".to_string(),
            LogicalType::Double => "DOUBLE".to_string(),
        }
    }

    /// Passes the name through upper-cased, `TEXT` when blank.
    fn fallback_type(&self, logical_type: &str) -> String {
        common::uppercase_fallback(logical_type)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_type_table() {
        let driver = MySqlDriver::new();
        assert_eq!(driver.map_type("serial"), "INT");
        assert_eq!(driver.map_type("bigserial"), "BIGINT");
        assert_eq!(driver.map_type("boolean"), "TINYINT(1)");
        assert_eq!(driver.map_type("uuid"), "VARCHAR(36)");
        assert_eq!(driver.map_type("jsonb"), "JSON");
        assert_eq!(driver.map_type("float"), "FLOAT");
    }

    #[test]
    fn test_map_type_fallback_upper_cases() {
        assert_eq!(MySqlDriver::new().map_type("mediumtext"), "MEDIUMTEXT");
    }

    #[test]
    fn test_empty_insert_uses_empty_value_list() {
        let query = MySqlDriver::new().insert("ticket_history", &HashMap::new()).unwrap();
        assert_eq!(query.sql, "INSERT INTO `ticket_history` () VALUES ()");
        assert!(query.args.is_empty());
    }

    #[test]
    fn test_select_quotes_with_backticks() {
        let query = MySqlDriver::new()
            .select("users", &["id", "login"], &[Condition::eq("valid_id", 1)])
            .unwrap();
        assert_eq!(query.sql, "SELECT `id`, `login` FROM `users` WHERE `valid_id` = ?");
        assert_eq!(query.args, vec![Value::Int(1)]);
    }
}
