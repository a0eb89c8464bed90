//! FromRow trait for mapping result rows to Rust structs

use crate::error::Result;
use crate::row::Row;

/// Trait for types that can be constructed from a result row.
///
/// This trait is typically implemented via `#[derive(FromRow)]`,
/// which reads each field from the column of the same name (or the
/// `#[orm(rename = "...")]` column).
///
/// # Manual Implementation
///
/// ```ignore
/// use aorm::{FromRow, Row, Result};
///
/// pub struct User {
///     pub id: i64,
///     pub name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> Result<Self> {
///         Ok(Self {
///             id: row.get("id")?,
///             name: row.get("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Construct an instance of this type from a result row.
    fn from_row(row: &Row) -> Result<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(row.clone())
    }
}
