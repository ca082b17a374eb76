//! # Connection Module
//!
//! The connection state shared by every concrete driver: an optional sqlx
//! `AnyPool` plus the pool options. Drivers embed a [`Connection`] and
//! delegate the connection-bound half of the [`Driver`](crate::Driver)
//! contract to it, keeping only SQL rendering dialect specific.

// ============================================================================
// External Crate Imports
// ============================================================================

use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Connection as _, Row};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    config::DriverOptions,
    driver::ExecResult,
    error::{Error, Result},
    query::{bind_arguments, Value},
    transaction::Transaction,
};

/// A driver's (possibly absent) connection pool.
#[derive(Debug)]
pub struct Connection {
    dialect: &'static str,
    options: DriverOptions,
    pool: Option<AnyPool>,
}

impl Connection {
    pub fn new(dialect: &'static str) -> Self {
        Self { dialect, options: DriverOptions::default(), pool: None }
    }

    pub fn options(&self) -> DriverOptions {
        self.options
    }

    pub fn set_options(&mut self, options: DriverOptions) {
        self.options = options;
    }

    pub fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    fn pool(&self) -> Result<&AnyPool> {
        self.pool.as_ref().ok_or_else(|| Error::NotConnected { dialect: self.dialect.to_string() })
    }

    /// Opens a pool to `endpoint` and pings it.
    ///
    /// `init` statements run on every new physical connection (e.g. SQLite
    /// pragmas). A previously open pool is closed first.
    pub async fn connect(&mut self, endpoint: &str, options: DriverOptions, init: &'static [&'static str]) -> Result<()> {
        if let Some(previous) = self.pool.take() {
            log::debug!("{}: closing existing pool before reconnecting", self.dialect);
            previous.close().await;
        }

        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(options.get_max_connections())
            .min_connections(options.get_min_connections())
            .acquire_timeout(options.acquire_timeout)
            .idle_timeout(options.idle_timeout)
            .max_lifetime(options.max_lifetime)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    for statement in init {
                        sqlx::query(statement).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(endpoint)
            .await
            .map_err(|source| Error::Connection { dialect: self.dialect.to_string(), source })?;

        let ping = async {
            let mut conn = pool.acquire().await?;
            conn.ping().await
        };
        if let Err(source) = ping.await {
            pool.close().await;
            return Err(Error::Connection { dialect: self.dialect.to_string(), source });
        }

        log::info!("{}: connected to {}", self.dialect, redact(endpoint));
        self.pool = Some(pool);
        Ok(())
    }

    /// Closes the pool. Closing a closed connection is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            log::info!("{}: connection closed", self.dialect);
        }
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        let pool = self.pool()?;
        let mut conn = pool
            .acquire()
            .await
            .map_err(|source| Error::Connection { dialect: self.dialect.to_string(), source })?;
        conn.ping().await.map_err(|source| Error::Connection { dialect: self.dialect.to_string(), source })
    }

    /// Executes a statement, honoring the configured statement timeout.
    pub async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        let pool = self.pool()?;
        log::debug!("{}: exec ({} args): {}", self.dialect, args.len(), sql);

        let arguments = bind_arguments(args).map_err(|e| Error::execution(self.dialect, sql, e))?;
        let execution = sqlx::query_with(sql, arguments).execute(pool);

        let result = match self.options.statement_timeout {
            Some(after) => tokio::time::timeout(after, execution).await.map_err(|_| Error::Timeout {
                dialect: self.dialect.to_string(),
                statement: sql.to_string(),
                after,
            })?,
            None => execution.await,
        }
        .map_err(|e| Error::execution(self.dialect, sql, e))?;

        Ok(ExecResult { rows_affected: result.rows_affected(), last_insert_id: result.last_insert_id() })
    }

    /// Runs a row-returning statement and collects every row.
    pub async fn fetch_all(&self, sql: &str, args: &[Value]) -> Result<Vec<AnyRow>> {
        let pool = self.pool()?;
        log::debug!("{}: fetch ({} args): {}", self.dialect, args.len(), sql);

        let arguments = bind_arguments(args).map_err(|e| Error::execution(self.dialect, sql, e))?;
        let fetch = sqlx::query_with(sql, arguments).fetch_all(pool);

        match self.options.statement_timeout {
            Some(after) => tokio::time::timeout(after, fetch).await.map_err(|_| Error::Timeout {
                dialect: self.dialect.to_string(),
                statement: sql.to_string(),
                after,
            })?,
            None => fetch.await,
        }
        .map_err(|e| Error::execution(self.dialect, sql, e))
    }

    /// Runs an existence probe that yields a single boolean or count column.
    pub async fn probe_exists(&self, sql: &str, table: &str) -> Result<bool> {
        let rows = self.fetch_all(sql, &[Value::from(table)]).await?;
        let Some(row) = rows.first() else {
            return Ok(false);
        };

        // MySQL and SQLite report a count, PostgreSQL a boolean.
        if let Ok(count) = row.try_get::<i64, _>(0) {
            return Ok(count > 0);
        }
        row.try_get::<bool, _>(0).map_err(|e| Error::execution(self.dialect, sql, e))
    }

    pub async fn begin(&self) -> Result<Transaction> {
        let pool = self.pool()?;
        let tx = pool.begin().await.map_err(|e| Error::execution(self.dialect, "BEGIN", e))?;
        log::debug!("{}: transaction started", self.dialect);
        Ok(Transaction::new(tx, self.dialect, self.options.statement_timeout))
    }
}

/// Strips credentials and path from an endpoint for logging.
fn redact(endpoint: &str) -> String {
    match endpoint.split_once("://") {
        Some((scheme, rest)) => {
            let host = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
            let host = host.split(['/', '?']).next().unwrap_or_default();
            format!("{}://{}", scheme, host)
        }
        None => endpoint.split('?').next().unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_hides_credentials() {
        assert_eq!(redact("postgres://otrs:secret@db:5432/otrs?sslmode=disable"), "postgres://db:5432");
        assert_eq!(redact("mysql://root@localhost/gotrs"), "mysql://localhost");
        assert_eq!(redact("sqlite::memory:"), "sqlite::memory:");
    }

    #[tokio::test]
    async fn test_exec_without_connect_is_not_connected() {
        let conn = Connection::new("sqlite");
        let err = conn.exec("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected { .. }));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut conn = Connection::new("sqlite");
        conn.close().await.unwrap();
        conn.close().await.unwrap();
        assert!(!conn.is_connected());
    }
}
