//! Fluent statement builder

use std::borrow::Cow;

use crate::error::Result;
use crate::row::Row;
use crate::traits::{Executor, FromRow, FromValue, ToValue};
use crate::value::Value;

/// A statement with its bound arguments.
///
/// # Example
///
/// ```ignore
/// use aorm::Statement;
///
/// let users: Vec<User> = Statement::new("select * from `users` where `admin`=?")
///     .bind(true)
///     .fetch_all(&pool)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Statement<'q> {
    sql: Cow<'q, str>,
    args: Vec<Value>,
}

impl<'q> Statement<'q> {
    /// Accepts both borrowed and built-at-runtime SQL.
    pub fn new(sql: impl Into<Cow<'q, str>>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    /// Bind the next positional argument.
    pub fn bind<T: ToValue>(mut self, value: T) -> Self {
        self.args.push(value.to_value());
        self
    }

    /// Bind several arguments in order.
    pub fn bind_all<T: ToValue>(mut self, values: &[T]) -> Self {
        self.args.extend(values.iter().map(ToValue::to_value));
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn into_parts(self) -> (Cow<'q, str>, Vec<Value>) {
        (self.sql, self.args)
    }

    /// Raw rows, all of them or at most `limit`.
    pub async fn query<E: Executor>(self, executor: &E, limit: Option<usize>) -> Result<Vec<Row>> {
        executor.query(&self.sql, self.args, limit).await
    }

    /// Run as a single autocommitted write.
    pub async fn execute<E: Executor>(self, executor: &E) -> Result<u64> {
        executor.execute(&self.sql, self.args, true).await
    }

    /// Run as a write, wrapped in its own transaction when `autocommit` is false.
    pub async fn execute_with<E: Executor>(self, executor: &E, autocommit: bool) -> Result<u64> {
        executor.execute(&self.sql, self.args, autocommit).await
    }

    pub async fn fetch_all<T: FromRow + Send, E: Executor>(self, executor: &E) -> Result<Vec<T>> {
        executor.fetch_all(&self.sql, self.args).await
    }

    pub async fn fetch_optional<T: FromRow + Send, E: Executor>(
        self,
        executor: &E,
    ) -> Result<Option<T>> {
        executor.fetch_optional(&self.sql, self.args).await
    }

    pub async fn fetch_one<T: FromRow + Send, E: Executor>(self, executor: &E) -> Result<T> {
        executor.fetch_one(&self.sql, self.args).await
    }

    /// First column of the first row.
    pub async fn fetch_scalar<T: FromValue + Send, E: Executor>(self, executor: &E) -> Result<T> {
        executor.fetch_scalar(&self.sql, self.args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_keeps_order() {
        let stmt = Statement::new("select * from t where a=? and b=? and c=?")
            .bind(1i64)
            .bind("x")
            .bind(None::<String>);

        assert_eq!(stmt.sql(), "select * from t where a=? and b=? and c=?");
        assert_eq!(
            stmt.args(),
            &[Value::Int(1), Value::Text("x".into()), Value::Null]
        );
    }

    #[test]
    fn test_bind_all_with_owned_sql() {
        let sql = format!("select * from t where id in ({})", ["?"; 3].join(", "));
        let (sql, args) = Statement::new(sql).bind_all(&[1i64, 2, 3]).into_parts();

        assert_eq!(sql, "select * from t where id in (?, ?, ?)");
        assert_eq!(args, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }
}
