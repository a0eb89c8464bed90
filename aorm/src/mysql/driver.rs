use std::sync::Arc;

use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder};
use tracing::debug;

use super::types::{from_mysql_row, to_mysql_value};
use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::traits::{Connection, Driver};
use crate::value::Value;

/// Opens plain `mysql_async` connections for the pool.
///
/// Every connection starts with `SET NAMES <charset>` and
/// `SET autocommit=<0|1>` taken from the pool config.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

impl Driver for MySqlDriver {
    type Conn = MySqlConnection;

    async fn connect(&self, config: &PoolConfig) -> Result<MySqlConnection> {
        let opts = connect_opts(config)?;
        let inner = Conn::new(opts).await?;
        debug!(connection_id = inner.id(), "connected to MySQL");
        Ok(MySqlConnection { inner })
    }
}

pub(crate) fn connect_opts(config: &PoolConfig) -> Result<OptsBuilder> {
    config.validate()?;

    let required = |value: &Option<String>, name: &str| {
        value
            .clone()
            .ok_or_else(|| Error::Config(format!("{} is required", name)))
    };

    let init = vec![
        format!("SET NAMES {}", config.charset),
        format!("SET autocommit={}", u8::from(config.autocommit)),
    ];

    Ok(OptsBuilder::default()
        .ip_or_hostname(config.host.clone())
        .tcp_port(config.port)
        .user(Some(required(&config.user, "user")?))
        .pass(Some(required(&config.password, "password")?))
        .db_name(Some(required(&config.database, "database")?))
        .init(init))
}

/// One live MySQL session.
pub struct MySqlConnection {
    inner: Conn,
}

impl MySqlConnection {
    /// Server-side connection id.
    pub fn id(&self) -> u32 {
        self.inner.id()
    }
}

impl Connection for MySqlConnection {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let params: Vec<mysql_async::Value> = params.iter().map(to_mysql_value).collect();
        self.inner.exec_drop(sql, params).await?;
        Ok(self.inner.affected_rows())
    }

    async fn fetch(
        &mut self,
        sql: &str,
        params: &[Value],
        limit: Option<usize>,
    ) -> Result<Vec<Row>> {
        let params: Vec<mysql_async::Value> = params.iter().map(to_mysql_value).collect();
        let mut result = self.inner.exec_iter(sql, params).await?;

        let mut columns: Option<Arc<[String]>> = None;
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            // Keep reading past the limit so the connection is left clean
            if limit.is_some_and(|n| rows.len() >= n) {
                continue;
            }
            let names = columns.get_or_insert_with(|| {
                row.columns_ref()
                    .iter()
                    .map(|c| c.name_str().into_owned())
                    .collect()
            });
            rows.push(from_mysql_row(Arc::clone(names), row)?);
        }
        result.drop_result().await?;

        Ok(rows)
    }

    async fn begin(&mut self) -> Result<()> {
        self.inner.query_drop("BEGIN").await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.inner.query_drop("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.inner.query_drop("ROLLBACK").await?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.inner.disconnect().await?;
        Ok(())
    }
}
