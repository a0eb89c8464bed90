//! Core traits for aorm

mod driver;
mod executor;
mod from_row;
mod from_value;
mod to_value;

pub use driver::{Connection, Driver};
pub use executor::Executor;
pub use from_row::FromRow;
pub use from_value::FromValue;
pub use to_value::ToValue;
