//! # Driver Module
//!
//! The capability contract every backend implements. It has two halves:
//!
//! - **Rendering** (`create_table`, `insert`, `map_type`, ...): pure functions
//!   of their inputs, taking `&self`, usable without any database and safe to
//!   call from many threads at once.
//! - **Execution** (`connect`, `exec`, `close`, ...): bound to the driver's
//!   own connection pool. `connect`, `configure` and `close` take `&mut self`,
//!   so a handle cannot be reconnected while it is in use elsewhere.
//!
//! Cancellation of an in-flight statement is done by dropping the future
//! returned by `exec`; an upper bound can be set with
//! [`DriverOptions::statement_timeout`](crate::DriverOptions::statement_timeout).
//! Nothing in this layer retries.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use sqlx::any::AnyRow;

use crate::{
    config::DriverOptions,
    error::Result,
    query::{Condition, RenderedQuery, Value},
    schema::{LogicalType, TableSchema},
    transaction::Transaction,
};

// ============================================================================
// Dialect Enum
// ============================================================================

/// The SQL dialect families supported by the built-in drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// PostgreSQL
    Postgres,
    /// MySQL / MariaDB
    MySql,
    /// SQLite
    Sqlite,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a non-row-returning statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Populated by backends that report generated keys (MySQL, SQLite).
    pub last_insert_id: Option<i64>,
}

// ============================================================================
// Driver Trait
// ============================================================================

/// A database backend: SQL rendering for one dialect plus a connection to it.
///
/// Obtain instances from a [`DriverRegistry`](crate::DriverRegistry). A fresh
/// driver is never connected; call [`connect`](Driver::connect) explicitly and
/// [`close`](Driver::close) when done.
#[async_trait]
pub trait Driver: Send + Sync + fmt::Debug {
    fn dialect(&self) -> Dialect;

    /// Canonical registry name of the dialect.
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    /// Pool settings used by the next `connect`.
    fn configure(&mut self, options: DriverOptions);

    fn options(&self) -> DriverOptions;

    // ------------------------------------------------------------------------
    // Connection lifecycle and execution
    // ------------------------------------------------------------------------

    /// Connects to `endpoint`. On an already connected driver the previous
    /// pool is closed before the new one replaces it.
    async fn connect(&mut self, endpoint: &str) -> Result<()>;

    /// Releases the connection. Further calls are no-ops.
    async fn close(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    async fn ping(&self) -> Result<()>;

    /// Executes `sql` with positional `args`. The statement is passed to the
    /// backend as is.
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult>;

    async fn fetch_all(&self, sql: &str, args: &[Value]) -> Result<Vec<AnyRow>>;

    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Starts a transaction on one pooled connection.
    async fn begin(&self) -> Result<Transaction>;

    /// Executes a rendered statement.
    async fn exec_query(&self, query: &RenderedQuery) -> Result<ExecResult> {
        self.exec(&query.sql, &query.args).await
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Quotes a table or column name for this dialect.
    fn quote_ident(&self, name: &str) -> Result<String>;

    /// `CREATE TABLE IF NOT EXISTS` for `schema`, without arguments.
    fn create_table(&self, schema: &TableSchema) -> Result<RenderedQuery>;

    /// Secondary indexes declared by `schema` that are not part of `create_table`.
    fn create_indexes(&self, schema: &TableSchema) -> Result<Vec<RenderedQuery>>;

    fn drop_table(&self, table: &str) -> Result<RenderedQuery>;

    /// INSERT with columns in lexicographic order. An empty map inserts a row
    /// of defaults. `Value::Null` renders a literal `NULL` and binds nothing.
    fn insert(&self, table: &str, values: &HashMap<String, Value>) -> Result<RenderedQuery>;

    /// [`insert`](Driver::insert) followed by `RETURNING` of `returning`, to
    /// be run with [`fetch_all`](Driver::fetch_all). An empty list renders a
    /// plain insert.
    ///
    /// Fails with [`Error::UnsupportedSchema`](crate::Error::UnsupportedSchema)
    /// when [`supports_returning`](Driver::supports_returning) is false.
    fn insert_returning(&self, table: &str, values: &HashMap<String, Value>, returning: &[&str]) -> Result<RenderedQuery>;

    /// UPDATE with SET columns in lexicographic order, conditions ANDed in the
    /// given order.
    fn update(&self, table: &str, values: &HashMap<String, Value>, conditions: &[Condition]) -> Result<RenderedQuery>;

    fn delete(&self, table: &str, conditions: &[Condition]) -> Result<RenderedQuery>;

    /// SELECT of `columns` (all columns when empty).
    ///
    /// On PostgreSQL, date/time, UUID and JSON columns cannot be decoded
    /// from an `AnyRow`; select them through a `::TEXT` cast instead.
    fn select(&self, table: &str, columns: &[&str], conditions: &[Condition]) -> Result<RenderedQuery>;

    /// Native column type for a recognized logical type.
    fn native_type(&self, logical_type: LogicalType) -> String;

    /// Best-effort type for a name outside the logical vocabulary.
    fn fallback_type(&self, logical_type: &str) -> String;

    /// Translates a logical type name into the dialect's column type.
    ///
    /// Total: unrecognized names go through [`fallback_type`](Driver::fallback_type).
    fn map_type(&self, logical_type: &str) -> String {
        match LogicalType::parse(logical_type) {
            Some(ty) => self.native_type(ty),
            None => self.fallback_type(logical_type),
        }
    }

    // ------------------------------------------------------------------------
    // Capabilities
    // ------------------------------------------------------------------------

    /// Whether INSERT can hand back generated values (`RETURNING`).
    fn supports_returning(&self) -> bool;

    /// Whether `ExecResult::last_insert_id` is populated after an insert.
    fn supports_last_insert_id(&self) -> bool;

    fn supports_arrays(&self) -> bool;
}
