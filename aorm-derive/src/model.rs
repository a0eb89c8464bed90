//! Model derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{spanned::Spanned, DeriveInput, Error, Result};

use crate::attrs::{infer_ddl, parse_fields, parse_table, FieldConfig};

fn quoted(name: &str) -> String {
    format!("`{}`", name)
}

/// `ToValue` conversion of one field, filling in its default when `None`.
fn insert_value(field: &FieldConfig) -> TokenStream {
    let ident = &field.ident;
    match &field.default {
        Some(default) => quote! {
            match &self.#ident {
                Some(value) => aorm::ToValue::to_value(value),
                None => aorm::ToValue::to_value(&#default()),
            }
        },
        None => quote! { aorm::ToValue::to_value(&self.#ident) },
    }
}

fn plain_value(field: &FieldConfig) -> TokenStream {
    let ident = &field.ident;
    quote! { aorm::ToValue::to_value(&self.#ident) }
}

fn column_meta(field: &FieldConfig) -> TokenStream {
    let name = field.ident.to_string();
    let column = &field.column;
    let ddl = field
        .ddl
        .clone()
        .unwrap_or_else(|| infer_ddl(&field.ty).to_string());
    let primary_key = field.primary_key;
    let has_default = field.default.is_some();
    quote! {
        aorm::Column {
            name: #name,
            column: #column,
            ddl: #ddl,
            primary_key: #primary_key,
            has_default: #has_default,
        }
    }
}

pub fn derive_model_impl(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let table = parse_table(&input)?;
    let field_configs = parse_fields(&input)?;
    let mapped: Vec<&FieldConfig> = field_configs.iter().filter(|f| !f.skip).collect();

    let mut keys = mapped.iter().filter(|f| f.primary_key);
    let pk = *keys
        .next()
        .ok_or_else(|| Error::new(input.span(), "primary key not found"))?;
    if let Some(duplicate) = keys.next() {
        return Err(Error::new(
            duplicate.ident.span(),
            format!("duplicate primary key for field `{}`", duplicate.ident),
        ));
    }

    let others: Vec<&FieldConfig> = mapped.iter().copied().filter(|f| !f.primary_key).collect();
    if others.is_empty() {
        return Err(Error::new(
            input.span(),
            "a model needs at least one column besides the primary key",
        ));
    }

    let table_q = quoted(&table);
    let pk_q = quoted(&pk.column);
    let others_q: Vec<String> = others.iter().map(|f| quoted(&f.column)).collect();

    let select_sql = format!(
        "select {}, {} from {}",
        pk_q,
        others_q.join(", "),
        table_q
    );
    let insert_sql = format!(
        "insert into {} ({}, {}) values ({})",
        table_q,
        others_q.join(", "),
        pk_q,
        vec!["?"; others.len() + 1].join(", ")
    );
    let update_sql = format!(
        "update {} set {} where {}=?",
        table_q,
        others_q
            .iter()
            .map(|c| format!("{}=?", c))
            .collect::<Vec<_>>()
            .join(", "),
        pk_q
    );
    let delete_sql = format!("delete from {} where {}=?", table_q, pk_q);

    let columns: Vec<TokenStream> = std::iter::once(pk)
        .chain(others.iter().copied())
        .map(column_meta)
        .collect();

    let pk_column = &pk.column;
    let pk_value = plain_value(pk);
    let insert_values: Vec<TokenStream> = others
        .iter()
        .copied()
        .chain(std::iter::once(pk))
        .map(insert_value)
        .collect();
    let update_values: Vec<TokenStream> = others
        .iter()
        .copied()
        .chain(std::iter::once(pk))
        .map(plain_value)
        .collect();

    let expanded = quote! {
        impl #impl_generics aorm::Model for #name #ty_generics #where_clause {
            const TABLE: &'static str = #table;
            const PRIMARY_KEY: &'static str = #pk_column;
            const COLUMNS: &'static [aorm::Column] = &[#(#columns),*];

            const SELECT_SQL: &'static str = #select_sql;
            const INSERT_SQL: &'static str = #insert_sql;
            const UPDATE_SQL: &'static str = #update_sql;
            const DELETE_SQL: &'static str = #delete_sql;

            fn primary_key_value(&self) -> aorm::Value {
                #pk_value
            }

            fn insert_values(&self) -> Vec<aorm::Value> {
                vec![#(#insert_values),*]
            }

            fn update_values(&self) -> Vec<aorm::Value> {
                vec![#(#update_values),*]
            }
        }
    };

    Ok(expanded)
}
