//! Statement execution against the pool

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::placeholder::{count_placeholders, PlaceholderStyle};
use crate::pool::{Pool, PooledConnection};
use crate::row::Row;
use crate::traits::{Driver, Executor};
use crate::value::Value;

/// Reject statements whose marker count disagrees with the argument list.
pub(crate) fn check_arity(sql: &str, args: &[Value]) -> Result<()> {
    let expected = count_placeholders(sql);
    if expected != args.len() {
        return Err(Error::Statement(format!(
            "statement expects {} argument(s), got {}",
            expected,
            args.len()
        )));
    }
    Ok(())
}

pub(crate) async fn run_query<D: Driver>(
    conn: &mut PooledConnection<D>,
    style: PlaceholderStyle,
    sql: &str,
    args: &[Value],
    limit: Option<usize>,
) -> Result<Vec<Row>> {
    let sql = style.normalize(sql);
    let mut rows = conn.fetch(&sql, args, limit).await?;
    if let Some(n) = limit {
        rows.truncate(n);
    }
    info!(rows = rows.len(), "rows returned");
    Ok(rows)
}

/// Run a write, wrapping it in BEGIN/COMMIT unless `autocommit` is set.
///
/// On failure after BEGIN the transaction is rolled back and the original
/// error returned. A connection whose rollback also failed is discarded.
pub(crate) async fn run_execute<D: Driver>(
    conn: &mut PooledConnection<D>,
    style: PlaceholderStyle,
    sql: &str,
    args: &[Value],
    autocommit: bool,
) -> Result<u64> {
    let sql = style.normalize(sql);
    if autocommit {
        return conn.execute(&sql, args).await;
    }

    conn.begin().await?;
    let outcome = match conn.execute(&sql, args).await {
        Ok(affected) => conn.commit().await.map(|()| affected),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(affected) => Ok(affected),
        Err(err) => {
            if let Err(rollback_err) = conn.rollback().await {
                warn!(error = %rollback_err, "rollback failed, discarding connection");
                conn.discard();
            }
            Err(err)
        }
    }
}

#[async_trait]
impl<D: Driver> Executor for Pool<D> {
    async fn query(&self, sql: &str, args: Vec<Value>, limit: Option<usize>) -> Result<Vec<Row>> {
        debug!(sql, args = args.len(), "SQL");
        check_arity(sql, &args)?;

        let mut conn = self.checkout().await?;
        run_query(&mut conn, self.placeholder_style(), sql, &args, limit).await
    }

    async fn execute(&self, sql: &str, args: Vec<Value>, autocommit: bool) -> Result<u64> {
        debug!(sql, args = args.len(), autocommit, "SQL");
        check_arity(sql, &args)?;

        let mut conn = self.checkout().await?;
        run_execute(&mut conn, self.placeholder_style(), sql, &args, autocommit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_arity() {
        assert!(check_arity("select 1", &[]).is_ok());
        assert!(check_arity("select * from t where a=?", &[Value::Int(1)]).is_ok());

        let err = check_arity("select * from t where a=? and b=?", &[Value::Int(1)]).unwrap_err();
        assert!(matches!(err, Error::Statement(msg) if msg.contains("expects 2")));
    }

    #[test]
    fn test_check_arity_ignores_quoted_markers() {
        assert!(check_arity("select '?' from t where a=?", &[Value::Int(1)]).is_ok());
    }

    #[test]
    fn test_check_arity_ignores_commented_markers() {
        assert!(check_arity("select * from t where a=? -- why?\n", &[Value::Int(1)]).is_ok());
        assert!(check_arity("select * from t /* ? */ where a=?", &[Value::Int(1)]).is_ok());
    }
}
