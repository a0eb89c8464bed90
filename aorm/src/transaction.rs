//! Explicit multi-statement transactions

use std::fmt;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::executor::{check_arity, run_query};
use crate::placeholder::PlaceholderStyle;
use crate::pool::{Pool, PooledConnection};
use crate::row::Row;
use crate::traits::{Driver, Executor};
use crate::value::Value;

/// A transaction pinned to one leased connection.
///
/// Implements [`Executor`], so model operations and typed fetches run
/// inside it. Statements are never wrapped again: the `autocommit` flag of
/// [`Executor::execute`] is ignored here.
///
/// Dropping the transaction without calling [`commit`](Self::commit) or
/// [`rollback`](Self::rollback) discards its connection, which the server
/// rolls back on disconnect.
///
/// # Example
///
/// ```ignore
/// let tx = pool.begin().await?;
/// tx.execute("update `users` set `admin`=? where `id`=?", vec![true.into(), id.into()], true).await?;
/// blog.save(&tx).await?;
/// tx.commit().await?;
/// ```
pub struct Transaction<D: Driver> {
    // Executor takes &self, the connection needs &mut
    conn: Mutex<Option<PooledConnection<D>>>,
    style: PlaceholderStyle,
}

impl<D: Driver> Pool<D> {
    /// Lease a connection and start a transaction on it.
    pub async fn begin(&self) -> Result<Transaction<D>> {
        let mut conn = self.checkout().await?;
        conn.begin().await?;
        debug!("transaction started");
        Ok(Transaction {
            conn: Mutex::new(Some(conn)),
            style: self.placeholder_style(),
        })
    }
}

fn finished() -> Error {
    Error::Connection("transaction already finished".to_string())
}

impl<D: Driver> Transaction<D> {
    fn take_inner(&mut self) -> Result<PooledConnection<D>> {
        self.conn.get_mut().take().ok_or_else(finished)
    }

    /// Commit and return the connection to the pool.
    ///
    /// If the commit fails the transaction is rolled back and the commit
    /// error returned.
    pub async fn commit(mut self) -> Result<()> {
        let mut conn = self.take_inner()?;
        match conn.commit().await {
            Ok(()) => {
                debug!("transaction committed");
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = conn.rollback().await {
                    warn!(error = %rollback_err, "rollback failed, discarding connection");
                    conn.discard();
                }
                Err(err)
            }
        }
    }

    /// Roll back and return the connection to the pool.
    pub async fn rollback(mut self) -> Result<()> {
        let mut conn = self.take_inner()?;
        match conn.rollback().await {
            Ok(()) => {
                debug!("transaction rolled back");
                Ok(())
            }
            Err(err) => {
                conn.discard();
                Err(err)
            }
        }
    }
}

impl<D: Driver> fmt::Debug for Transaction<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

impl<D: Driver> Drop for Transaction<D> {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.get_mut().take() {
            warn!("transaction dropped without commit or rollback");
            conn.discard();
        }
    }
}

#[async_trait]
impl<D: Driver> Executor for Transaction<D> {
    async fn query(&self, sql: &str, args: Vec<Value>, limit: Option<usize>) -> Result<Vec<Row>> {
        debug!(sql, args = args.len(), "SQL");
        check_arity(sql, &args)?;

        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(finished)?;
        run_query(conn, self.style, sql, &args, limit).await
    }

    async fn execute(&self, sql: &str, args: Vec<Value>, _autocommit: bool) -> Result<u64> {
        debug!(sql, args = args.len(), "SQL");
        check_arity(sql, &args)?;

        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(finished)?;
        conn.execute(&self.style.normalize(sql), &args).await
    }
}
