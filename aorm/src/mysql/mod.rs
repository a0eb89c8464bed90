//! MySQL driver built on `mysql_async`

mod driver;
mod types;

pub use driver::{MySqlConnection, MySqlDriver};
