//! Built-in driver implementations.
//!
//! - [`postgres`]: PostgreSQL (`$n` placeholders, INSERT ... RETURNING)
//! - [`mysql`]: MySQL / MariaDB (`?` placeholders, AUTO_INCREMENT)
//! - [`sqlite`]: SQLite (`?` placeholders, rowid alias keys)
//! - `common`: statement assembly shared by all three
//!
//! Each driver pairs the dialect's renderers with a
//! [`Connection`](crate::connection::Connection) over a sqlx `AnyPool`.

mod common;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mysql::MySqlDriver;
pub use postgres::PostgresDriver;
pub use sqlite::SqliteDriver;
