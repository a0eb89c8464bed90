//! `#[orm(...)]` attribute parsing shared by the derives

use syn::{
    spanned::Spanned, Data, DeriveInput, Error, Field, Fields, GenericArgument, Ident, LitStr,
    PathArguments, Result, Type,
};

/// Per-field configuration
pub struct FieldConfig {
    pub ident: Ident,
    pub ty: Type,
    /// Column name to use (may be renamed)
    pub column: String,
    pub skip: bool,
    pub primary_key: bool,
    /// Explicit DDL type
    pub ddl: Option<String>,
    /// Function producing a value on insert when the field is `None`
    pub default: Option<syn::Path>,
}

fn attr_name(path: &syn::Path) -> String {
    path.get_ident().map(|i| i.to_string()).unwrap_or_default()
}

fn parse_field_config(field: &Field) -> Result<FieldConfig> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| Error::new(field.span(), "tuple structs are not supported"))?;

    let mut config = FieldConfig {
        column: ident.to_string(),
        ident,
        ty: field.ty.clone(),
        skip: false,
        primary_key: false,
        ddl: None,
        default: None,
    };

    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                config.column = lit.value();
            } else if meta.path.is_ident("skip") {
                config.skip = true;
            } else if meta.path.is_ident("primary_key") {
                config.primary_key = true;
            } else if meta.path.is_ident("ddl") {
                let lit: LitStr = meta.value()?.parse()?;
                config.ddl = Some(lit.value());
            } else if meta.path.is_ident("default") {
                let lit: LitStr = meta.value()?.parse()?;
                config.default = Some(lit.parse()?);
            } else {
                return Err(meta.error(format!(
                    "unknown orm attribute `{}`",
                    attr_name(&meta.path)
                )));
            }
            Ok(())
        })?;
    }

    if config.skip && (config.primary_key || config.default.is_some()) {
        return Err(Error::new(
            field.span(),
            "`skip` cannot be combined with `primary_key` or `default`",
        ));
    }
    if config.default.is_some() && option_inner(&config.ty).is_none() {
        return Err(Error::new(
            field.ty.span(),
            "fields with a `default` must be `Option<_>`",
        ));
    }

    Ok(config)
}

/// Parse every named field of a struct.
pub fn parse_fields(input: &DeriveInput) -> Result<Vec<FieldConfig>> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Err(Error::new(input.span(), "only named fields are supported")),
        },
        _ => return Err(Error::new(input.span(), "only structs are supported")),
    };

    fields.iter().map(parse_field_config).collect()
}

/// Table name from `#[orm(table = "...")]`, defaulting to the struct name.
pub fn parse_table(input: &DeriveInput) -> Result<String> {
    let mut table = input.ident.to_string();
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                table = lit.value();
                Ok(())
            } else {
                Err(meta.error(format!(
                    "unknown orm attribute `{}`",
                    attr_name(&meta.path)
                )))
            }
        })?;
    }
    Ok(table)
}

/// `T` for `Option<T>`.
pub fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

/// Column type for a field without an explicit `ddl`.
pub fn infer_ddl(ty: &Type) -> &'static str {
    let ty = option_inner(ty).unwrap_or(ty);
    let Type::Path(path) = ty else {
        return "text";
    };
    let Some(segment) = path.path.segments.last() else {
        return "text";
    };
    match segment.ident.to_string().as_str() {
        "String" => "varchar(100)",
        "bool" => "boolean",
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            "bigint"
        }
        "f32" | "f64" => "real",
        _ => "text",
    }
}
