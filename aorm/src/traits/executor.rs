//! Executor trait: the statement-level API shared by pools and transactions

use crate::error::{Error, Result};
use crate::row::Row;
use crate::traits::{FromRow, FromValue};
use crate::value::Value;
use async_trait::async_trait;

/// Something that can run statements: a [`Pool`](crate::Pool) or an open
/// [`Transaction`](crate::Transaction).
///
/// Statements use `?` placeholders regardless of the backing driver.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a read and return its rows, all of them or at most `limit`.
    async fn query(&self, sql: &str, args: Vec<Value>, limit: Option<usize>) -> Result<Vec<Row>>;

    /// Run a write and return the affected-row count.
    ///
    /// With `autocommit` false the statement runs inside its own explicit
    /// transaction: committed on success, rolled back on failure.
    async fn execute(&self, sql: &str, args: Vec<Value>, autocommit: bool) -> Result<u64>;

    /// Fetch all rows mapped to `T`.
    async fn fetch_all<T: FromRow + Send>(&self, sql: &str, args: Vec<Value>) -> Result<Vec<T>> {
        self.query(sql, args, None)
            .await?
            .iter()
            .map(T::from_row)
            .collect()
    }

    /// Fetch the first row mapped to `T`, if any.
    async fn fetch_optional<T: FromRow + Send>(
        &self,
        sql: &str,
        args: Vec<Value>,
    ) -> Result<Option<T>> {
        self.query(sql, args, Some(1))
            .await?
            .first()
            .map(T::from_row)
            .transpose()
    }

    /// Fetch exactly one row, returning an error if not found.
    async fn fetch_one<T: FromRow + Send>(&self, sql: &str, args: Vec<Value>) -> Result<T> {
        self.fetch_optional(sql, args)
            .await?
            .ok_or_else(|| Error::Statement("Expected one row, found none".to_string()))
    }

    /// Fetch a scalar value (first column of first row).
    async fn fetch_scalar<T: FromValue + Send>(&self, sql: &str, args: Vec<Value>) -> Result<T> {
        let rows = self.query(sql, args, Some(1)).await?;
        let value = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::Statement("Expected one row, found none".to_string()))?
            .into_values()
            .into_iter()
            .next()
            .ok_or_else(|| Error::Statement("Expected at least one column".to_string()))?;
        T::from_value(value)
    }
}

#[async_trait]
impl<E: Executor + ?Sized> Executor for &E {
    async fn query(&self, sql: &str, args: Vec<Value>, limit: Option<usize>) -> Result<Vec<Row>> {
        (**self).query(sql, args, limit).await
    }

    async fn execute(&self, sql: &str, args: Vec<Value>, autocommit: bool) -> Result<u64> {
        (**self).execute(sql, args, autocommit).await
    }
}
