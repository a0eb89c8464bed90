//! Derive macros for the aorm MySQL ORM
//!
//! This crate provides the following derive macros:
//! - `FromRow` - Maps result rows to Rust structs
//! - `Model` - Maps a struct onto a table and generates its SQL templates
//!
//! These macros are re-exported from the `aorm` crate, so users typically
//! don't need to depend on this crate directly.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod attrs;
mod from_row;
mod model;

/// Derive macro for mapping result rows to Rust structs.
///
/// # Attributes
///
/// - `#[orm(rename = "column_name")]` - Use a different column name for this field
/// - `#[orm(skip)]` - Skip this field and fill it with `Default::default()`
///
/// # Example
///
/// ```ignore
/// use aorm::FromRow;
///
/// #[derive(FromRow)]
/// pub struct User {
///     pub id: String,
///     #[orm(rename = "user_name")]
///     pub name: String,
///     pub email: String,
/// }
/// ```
#[proc_macro_derive(FromRow, attributes(orm))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::derive_from_row_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive macro for table-mapped models.
///
/// Generates an implementation of `aorm::Model`; pair it with `FromRow`.
///
/// # Attributes
///
/// - `#[orm(table = "name")]` on the struct - Table name (defaults to the struct name)
/// - `#[orm(primary_key)]` - The primary key column; exactly one field must carry it
/// - `#[orm(ddl = "varchar(50)")]` - Column type, otherwise inferred from the field type
/// - `#[orm(default = "path::to::fn")]` - Value used on insert when an `Option` field is `None`
/// - `#[orm(rename = "column_name")]` / `#[orm(skip)]` - As for `FromRow`
///
/// # Example
///
/// ```ignore
/// use aorm::{FromRow, Model};
///
/// #[derive(FromRow, Model)]
/// #[orm(table = "blogs")]
/// pub struct Blog {
///     #[orm(primary_key, ddl = "varchar(50)", default = "next_id")]
///     pub id: Option<String>,
///     pub name: String,
///     #[orm(ddl = "mediumtext")]
///     pub content: String,
/// }
/// ```
#[proc_macro_derive(Model, attributes(orm))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    model::derive_model_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
