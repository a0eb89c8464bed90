//! Driver seam: the capability set the pool and executor rely on

use std::future::Future;

use crate::config::PoolConfig;
use crate::error::Result;
use crate::placeholder::PlaceholderStyle;
use crate::row::Row;
use crate::value::Value;

/// A single live database connection owned by the pool.
///
/// The pool guarantees exclusive access: at most one caller holds a given
/// connection at a time, so every operation takes `&mut self`.
pub trait Connection: Send + 'static {
    /// Execute a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> impl Future<Output = Result<u64>> + Send;

    /// Execute a statement and fetch its rows.
    ///
    /// With `limit` set, at most that many rows are returned; the rest of
    /// the result set is drained and discarded.
    fn fetch(
        &mut self,
        sql: &str,
        params: &[Value],
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Start an explicit transaction.
    fn begin(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Commit the open transaction.
    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Roll back the open transaction.
    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection gracefully.
    fn close(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;
}

/// Factory for connections of one database backend.
pub trait Driver: Send + Sync + 'static {
    /// The connection type this driver produces.
    type Conn: Connection;

    /// Marker syntax for positional parameters.
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }

    /// Open a new connection using the pool's connection parameters.
    fn connect(&self, config: &PoolConfig) -> impl Future<Output = Result<Self::Conn>> + Send;
}
