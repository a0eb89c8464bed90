//! FromRow derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

use crate::attrs::parse_fields;

pub fn derive_from_row_impl(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let field_configs = parse_fields(&input)?;

    let field_extractions: Vec<TokenStream> = field_configs
        .iter()
        .map(|config| {
            let field_ident = &config.ident;
            let column = &config.column;
            let ty = &config.ty;

            if config.skip {
                quote! {
                    #field_ident: <#ty as std::default::Default>::default()
                }
            } else {
                quote! {
                    #field_ident: row.get::<#ty>(#column)?
                }
            }
        })
        .collect();

    let expanded = quote! {
        impl #impl_generics aorm::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &aorm::Row) -> aorm::Result<Self> {
                Ok(Self {
                    #(#field_extractions),*
                })
            }
        }
    };

    Ok(expanded)
}
