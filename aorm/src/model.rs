//! Table-mapped models and their CRUD operations
//!
//! `#[derive(Model)]` describes how a struct maps onto a table: its column
//! list with DDL types, the primary key, and the four statement templates
//! built from them. [`ModelExt`] runs those templates through any
//! [`Executor`].

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::traits::{Executor, FromRow, ToValue};
use crate::value::Value;

/// Schema metadata for one mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Rust field name
    pub name: &'static str,
    /// Column name in the table
    pub column: &'static str,
    /// Column type used in DDL, e.g. `varchar(50)`
    pub ddl: &'static str,
    pub primary_key: bool,
    /// Whether a default producer fills the field on insert
    pub has_default: bool,
}

/// A struct mapped onto a table.
///
/// Normally derived:
///
/// ```ignore
/// #[derive(FromRow, Model)]
/// #[orm(table = "users")]
/// pub struct User {
///     #[orm(primary_key, ddl = "varchar(50)", default = "next_id")]
///     pub id: Option<String>,
///     pub email: String,
///     pub admin: bool,
/// }
/// ```
pub trait Model: FromRow + Send + Sync + 'static {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str;
    /// Primary key first, then the other mapped fields in declaration order
    const COLUMNS: &'static [Column];

    /// ``select `pk`, `f1`, ... from `table` ``
    const SELECT_SQL: &'static str;
    /// ``insert into `table` (`f1`, ..., `pk`) values (?, ..., ?)``
    const INSERT_SQL: &'static str;
    /// ``update `table` set `f1`=?, ... where `pk`=?``
    const UPDATE_SQL: &'static str;
    /// ``delete from `table` where `pk`=?``
    const DELETE_SQL: &'static str;

    fn primary_key_value(&self) -> Value;

    /// Arguments for [`INSERT_SQL`](Self::INSERT_SQL), defaults applied.
    fn insert_values(&self) -> Vec<Value>;

    /// Arguments for [`UPDATE_SQL`](Self::UPDATE_SQL).
    fn update_values(&self) -> Vec<Value>;

    /// `create table` statement built from [`COLUMNS`](Self::COLUMNS).
    fn create_table_sql() -> String {
        let mut defs: Vec<String> = Self::COLUMNS
            .iter()
            .map(|c| format!("`{}` {}", c.column, c.ddl))
            .collect();
        defs.push(format!("primary key (`{}`)", Self::PRIMARY_KEY));
        format!("create table `{}` ({})", Self::TABLE, defs.join(", "))
    }
}

/// Row window for [`ModelExt::find_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// `limit ?`
    Count(u64),
    /// `limit ?, ?`
    Range { offset: u64, count: u64 },
}

impl From<u64> for Limit {
    fn from(count: u64) -> Self {
        Limit::Count(count)
    }
}

impl From<(u64, u64)> for Limit {
    fn from((offset, count): (u64, u64)) -> Self {
        Limit::Range { offset, count }
    }
}

/// Filter, ordering and window for [`ModelExt::find_all`].
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    filter: Option<String>,
    args: Vec<Value>,
    order_by: Option<String>,
    limit: Option<Limit>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `where` clause body, with `?` markers for [`bind`](Self::bind) arguments.
    pub fn filter(mut self, clause: impl Into<String>) -> Self {
        self.filter = Some(clause.into());
        self
    }

    pub fn bind<T: ToValue>(mut self, value: T) -> Self {
        self.args.push(value.to_value());
        self
    }

    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order_by = Some(order.into());
        self
    }

    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    /// Append the clauses to `select` and collect the arguments.
    pub fn to_sql(&self, select: &str) -> (String, Vec<Value>) {
        let mut sql = String::from(select);
        let mut args = self.args.clone();

        if let Some(filter) = &self.filter {
            sql.push_str(" where ");
            sql.push_str(filter);
        }
        if let Some(order) = &self.order_by {
            sql.push_str(" order by ");
            sql.push_str(order);
        }
        match self.limit {
            Some(Limit::Count(count)) => {
                sql.push_str(" limit ?");
                args.push(Value::UInt(count));
            }
            Some(Limit::Range { offset, count }) => {
                sql.push_str(" limit ?, ?");
                args.push(Value::UInt(offset));
                args.push(Value::UInt(count));
            }
            None => {}
        }

        (sql, args)
    }
}

fn check_affected(action: &str, table: &str, affected: u64) {
    if affected != 1 {
        warn!(table, affected, "failed to {} by primary key", action);
    }
}

/// CRUD operations for every [`Model`].
#[async_trait]
pub trait ModelExt: Model {
    /// All rows matching `options`.
    async fn find_all<E: Executor>(executor: &E, options: FindOptions) -> Result<Vec<Self>> {
        let (sql, args) = options.to_sql(Self::SELECT_SQL);
        executor.fetch_all(&sql, args).await
    }

    /// Evaluate `expr` (e.g. `count(id)`) over the table.
    ///
    /// Returns `None` when the query yields no row.
    async fn find_number<E: Executor>(
        executor: &E,
        expr: &str,
        filter: Option<&str>,
        args: Vec<Value>,
    ) -> Result<Option<Value>> {
        let mut sql = format!("select {} _num_ from `{}`", expr, Self::TABLE);
        if let Some(filter) = filter {
            sql.push_str(" where ");
            sql.push_str(filter);
        }

        let rows = executor.query(&sql, args, Some(1)).await?;
        rows.first()
            .map(|row| row.get_value("_num_").cloned())
            .transpose()
    }

    /// Look a row up by primary key.
    async fn find<E: Executor, K: ToValue + Send>(executor: &E, pk: K) -> Result<Option<Self>> {
        let sql = format!("{} where `{}`=?", Self::SELECT_SQL, Self::PRIMARY_KEY);
        executor.fetch_optional(&sql, vec![pk.to_value()]).await
    }

    /// Insert this entity. Fields with a default producer and no value get one.
    async fn save<E: Executor>(&self, executor: &E) -> Result<u64> {
        let affected = executor
            .execute(Self::INSERT_SQL, self.insert_values(), true)
            .await?;
        check_affected("insert record", Self::TABLE, affected);
        Ok(affected)
    }

    /// Write every mapped field back by primary key.
    async fn update<E: Executor>(&self, executor: &E) -> Result<u64> {
        let affected = executor
            .execute(Self::UPDATE_SQL, self.update_values(), true)
            .await?;
        check_affected("update record", Self::TABLE, affected);
        Ok(affected)
    }

    /// Delete by primary key.
    async fn remove<E: Executor>(&self, executor: &E) -> Result<u64> {
        let affected = executor
            .execute(Self::DELETE_SQL, vec![self.primary_key_value()], true)
            .await?;
        check_affected("remove record", Self::TABLE, affected);
        Ok(affected)
    }
}

impl<M: Model> ModelExt for M {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_options_clauses() {
        let (sql, args) = FindOptions::new()
            .filter("`user_id`=?")
            .bind("u1")
            .order_by("`created_at` desc")
            .limit((10, 5))
            .to_sql("select `id`, `name` from `blogs`");

        assert_eq!(
            sql,
            "select `id`, `name` from `blogs` where `user_id`=? order by `created_at` desc limit ?, ?"
        );
        assert_eq!(
            args,
            vec![Value::Text("u1".into()), Value::UInt(10), Value::UInt(5)]
        );
    }

    #[test]
    fn test_find_options_empty() {
        let (sql, args) = FindOptions::new().to_sql("select `id` from `t`");
        assert_eq!(sql, "select `id` from `t`");
        assert!(args.is_empty());
    }

    #[test]
    fn test_find_options_count_limit() {
        let (sql, args) = FindOptions::new().limit(3).to_sql("select `id` from `t`");
        assert_eq!(sql, "select `id` from `t` limit ?");
        assert_eq!(args, vec![Value::UInt(3)]);
    }
}
