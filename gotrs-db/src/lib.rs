//! # gotrs-db
//!
//! Driver-agnostic schema model and per-dialect SQL generation.
//!
//! Application code describes tables in a declarative YAML document, loads
//! them into a [`SchemaRegistry`], asks a [`DriverRegistry`] for a backend by
//! name and lets that driver render `CREATE TABLE` / `INSERT` / `UPDATE` /
//! `DELETE` / `SELECT` statements. Rendering is pure and needs no database;
//! execution goes through the same driver once it is connected.
//!
//! ```rust,ignore
//! use gotrs_db::{DriverRegistry, SchemaRegistry, Value};
//! use std::collections::HashMap;
//!
//! let mut schemas = SchemaRegistry::new();
//! schemas.load_from_str(r#"
//! queue:
//!   pk: id
//!   columns:
//!     id: serial
//!     name: { type: varchar(200), required: true, unique: true }
//!   timestamps: true
//! "#)?;
//!
//! let drivers = DriverRegistry::with_builtins();
//! let mut driver = drivers.get_driver("sqlite")?;
//! driver.connect("sqlite::memory:").await?;
//!
//! let ddl = driver.create_table(schemas.get_schema("queue").unwrap())?;
//! driver.exec(&ddl.sql, &ddl.args).await?;
//!
//! let mut row = HashMap::new();
//! row.insert("name".to_string(), Value::from("Raw"));
//! let insert = driver.insert("queue", &row)?;
//! driver.exec(&insert.sql, &insert.args).await?;
//!
//! driver.close().await?;
//! ```

pub mod config;
pub mod connection;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod identifier;
pub mod loader;
pub mod migration;
pub mod query;
pub mod registry;
pub mod schema;
pub mod transaction;

pub use config::{DatabaseConfig, DriverOptions};
pub use driver::{Dialect, Driver, ExecResult};
pub use drivers::{MySqlDriver, PostgresDriver, SqliteDriver};
pub use error::{Error, Result};
pub use loader::SchemaRegistry;
pub use migration::Migrator;
pub use query::{Condition, RenderedQuery, Value};
pub use registry::{DriverFactory, DriverRegistry};
pub use schema::{ColumnDefinition, DefaultValue, LogicalType, TableSchema};
pub use transaction::Transaction;

/// Rows returned by [`Driver::fetch_all`] and the accessor trait to read them.
pub use sqlx::{any::AnyRow, Row};
