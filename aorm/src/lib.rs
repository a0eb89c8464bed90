//! aorm - a minimal async ORM for MySQL
//!
//! A bounded connection pool, a two-call statement API (`query` for reads,
//! `execute` for writes) and derive macros that map structs onto tables.
//!
//! # Features
//!
//! - **Pool**: fair, bounded checkout with an acquire timeout; leases are
//!   returned on drop and shutdown drains in-flight work
//! - **Executor**: `?` placeholders everywhere, per-statement transactions
//!   when autocommit is off, explicit [`Transaction`]s for multi-statement work
//! - **Models**: `#[derive(FromRow, Model)]` generates the table metadata
//!   and the select/insert/update/delete templates
//!
//! # Example
//!
//! ```ignore
//! use aorm::{FromRow, Model, ModelExt, MySqlDriver, PoolConfig, PoolManager};
//!
//! #[derive(FromRow, Model)]
//! #[orm(table = "users")]
//! pub struct User {
//!     #[orm(primary_key, ddl = "varchar(50)")]
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! let manager = PoolManager::new();
//! let pool = manager
//!     .initialize(MySqlDriver, PoolConfig::new("www-data", "www-data", "awesome"))
//!     .await?;
//! let user = User::find(&pool, "0001").await?;
//! manager.shutdown().await?;
//! ```

// Lets the derive output's `aorm::` paths resolve inside this crate too
extern crate self as aorm;

pub mod config;
pub mod error;
mod executor;
pub mod model;
pub mod mysql;
pub mod placeholder;
pub mod pool;
pub mod row;
pub mod statement;
pub mod traits;
pub mod transaction;
pub mod value;

// Re-export the derive macros
pub use aorm_derive::{FromRow, Model};

pub use config::PoolConfig;
pub use error::{Error, Result};
pub use model::{Column, FindOptions, Limit, Model, ModelExt};
pub use mysql::{MySqlConnection, MySqlDriver};
pub use placeholder::PlaceholderStyle;
pub use pool::{Pool, PoolManager, PoolStatus, PooledConnection};
pub use row::Row;
pub use statement::Statement;
pub use traits::{Connection, Driver, Executor, FromRow, FromValue, ToValue};
pub use transaction::Transaction;
pub use value::Value;
