use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Lit, Meta, Type};

/// Derive macro describing the CSV columns a row struct serializes to.
///
/// For each field:
/// - column name (respects `#[serde(rename = "...")]`)
/// - required unless the type is `Option<T>` or the field has `#[serde(default)]`
/// - description from the doc comment, or the `#[tabled(rename = "...")]` header
///
/// Fields marked `#[serde(skip)]` or `#[serde(skip_serializing)]` are left out.
///
/// Generates `csv_schema() -> &'static [CsvField]`; `CsvField` must be in scope.
#[proc_macro_derive(CsvSchema, attributes(serde, tabled))]
pub fn derive_csv_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return syn::Error::new_spanned(name, "CsvSchema only supports structs with named fields")
                    .to_compile_error()
                    .into()
            }
        },
        _ => {
            return syn::Error::new_spanned(name, "CsvSchema only supports structs")
                .to_compile_error()
                .into()
        }
    };

    let field_entries = fields
        .iter()
        .filter(|field| !serde_flag(&field.attrs, "skip") && !serde_flag(&field.attrs, "skip_serializing"))
        .filter_map(|field| {
            let ident = field.ident.as_ref()?;
            let column = attr_string(&field.attrs, "serde", "rename").unwrap_or_else(|| ident.to_string());
            let required = !is_option_type(&field.ty) && !serde_flag(&field.attrs, "default");
            let description = doc_comment(&field.attrs)
                .or_else(|| attr_string(&field.attrs, "tabled", "rename"))
                .unwrap_or_default();
            Some(quote! {
                CsvField {
                    name: #column,
                    required: #required,
                    description: #description,
                }
            })
        });

    let expanded = quote! {
        impl #name {
            pub fn csv_schema() -> &'static [CsvField] {
                static SCHEMA: &[CsvField] = &[
                    #(#field_entries),*
                ];
                SCHEMA
            }
        }
    };

    TokenStream::from(expanded)
}

fn attr_tokens<'a>(attrs: &'a [Attribute], path: &'a str) -> impl Iterator<Item = String> + 'a {
    attrs.iter().filter_map(move |attr| {
        if !attr.path().is_ident(path) {
            return None;
        }
        match &attr.meta {
            Meta::List(list) => Some(list.tokens.to_string()),
            _ => None,
        }
    })
}

/// Value of `key = "..."` inside `#[path(...)]`
fn attr_string(attrs: &[Attribute], path: &str, key: &str) -> Option<String> {
    attr_tokens(attrs, path).find_map(|tokens| {
        tokens.split(',').find_map(|part| {
            let (k, v) = part.split_once('=')?;
            if k.trim() != key {
                return None;
            }
            let v = v.trim();
            v.strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .map(str::to_string)
        })
    })
}

/// Bare flag such as `default` or `skip` inside `#[serde(...)]`
fn serde_flag(attrs: &[Attribute], flag: &str) -> bool {
    attr_tokens(attrs, "serde").any(|tokens| {
        tokens
            .split(',')
            .map(str::trim)
            .any(|part| part == flag || part.starts_with(&format!("{flag} =")))
    })
}

fn doc_comment(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(meta) => match &meta.value {
                syn::Expr::Lit(expr_lit) => match &expr_lit.lit {
                    Lit::Str(lit_str) => Some(lit_str.value().trim().to_string()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}

fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}
