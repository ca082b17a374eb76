//! Passthrough transactions.
//!
//! A thin wrapper around a sqlx transaction: statements run on the
//! transaction's connection and the caller decides whether to commit or roll
//! back. There is no nesting, savepoint handling or retry logic.

use std::time::Duration;

use crate::{
    driver::ExecResult,
    error::{Error, Result},
    query::{bind_arguments, RenderedQuery, Value},
};

/// An open transaction obtained from [`Driver::begin`](crate::Driver::begin).
///
/// Dropping it without calling [`commit`](Transaction::commit) rolls it back.
#[derive(Debug)]
pub struct Transaction {
    tx: sqlx::Transaction<'static, sqlx::Any>,
    dialect: &'static str,
    statement_timeout: Option<Duration>,
}

impl Transaction {
    pub(crate) fn new(
        tx: sqlx::Transaction<'static, sqlx::Any>,
        dialect: &'static str,
        statement_timeout: Option<Duration>,
    ) -> Self {
        Self { tx, dialect, statement_timeout }
    }

    /// Executes a statement inside the transaction.
    pub async fn exec(&mut self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        log::debug!("{}: tx exec ({} args): {}", self.dialect, args.len(), sql);

        let arguments = bind_arguments(args).map_err(|e| Error::execution(self.dialect, sql, e))?;
        let execution = sqlx::query_with(sql, arguments).execute(&mut *self.tx);

        let result = match self.statement_timeout {
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

    /// Executes a rendered statement inside the transaction.
    pub async fn exec_query(&mut self, query: &RenderedQuery) -> Result<ExecResult> {
        self.exec(&query.sql, &query.args).await
    }

    /// Persists all changes made during the transaction.
    pub async fn commit(self) -> Result<()> {
        let dialect = self.dialect;
        self.tx.commit().await.map_err(|e| Error::execution(dialect, "COMMIT", e))?;
        log::debug!("{}: transaction committed", dialect);
        Ok(())
    }

    /// Reverts all changes made during the transaction.
    pub async fn rollback(self) -> Result<()> {
        let dialect = self.dialect;
        self.tx.rollback().await.map_err(|e| Error::execution(dialect, "ROLLBACK", e))?;
        log::debug!("{}: transaction rolled back", dialect);
        Ok(())
    }
}
