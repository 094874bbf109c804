//! Implementation of the `#[derive(Fields)]` macro.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    spanned::Spanned, Data, DeriveInput, Error, Fields, GenericArgument, PathArguments, Result,
    Type,
};

use super::attrs::{parse_field_attrs, FieldAttr};

/// Main implementation of the Fields derive macro.
pub fn fields_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new(
                    input.span(),
                    "Fields can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.span(),
                "Fields can only be derived for structs",
            ))
        }
    };

    let mut entries: Vec<TokenStream> = Vec::new();
    let mut field_constants: Vec<TokenStream> = Vec::new();

    for field in fields.iter() {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new(field.span(), "expected named field"))?;

        let attr = parse_field_attrs(&field.attrs)?;
        if attr.skip {
            continue;
        }

        let template_name = attr
            .rename
            .clone()
            .unwrap_or_else(|| field_name.to_string());
        validate_name(&template_name, &attr, field)?;

        let const_name = format_ident!("{}", to_screaming_snake_case(&template_name));
        field_constants.push(quote! {
            /// Template field name.
            pub const #const_name: &'static str = #template_name;
        });

        let value = value_expr(field_name, &field.ty, &attr);
        entries.push(quote! {
            (::std::string::String::from(#template_name), #value)
        });
    }

    let expanded = quote! {
        impl #impl_generics #struct_name #ty_generics #where_clause {
            #(#field_constants)*
        }

        impl #impl_generics ::stanza::FieldSource for #struct_name #ty_generics #where_clause {
            fn fields(&self) -> ::std::vec::Vec<(::std::string::String, ::std::string::String)> {
                ::std::vec![#(#entries),*]
            }
        }
    };

    Ok(expanded)
}

fn value_expr(field_name: &syn::Ident, ty: &Type, attr: &FieldAttr) -> TokenStream {
    if let Some(with) = &attr.with {
        return quote! { #with(&self.#field_name) };
    }

    let format_inner = |value: TokenStream| match &attr.format {
        Some(fmt) => quote! { ::std::format!(#fmt, #value) },
        None => quote! { ::std::string::ToString::to_string(#value) },
    };

    if is_option(ty) {
        let inner = format_inner(quote! { value });
        quote! {
            match &self.#field_name {
                ::std::option::Option::Some(value) => #inner,
                ::std::option::Option::None => ::std::string::String::new(),
            }
        }
    } else {
        format_inner(quote! { &self.#field_name })
    }
}

/// Whether the type is spelled `Option<T>` (any path ending in `Option`).
fn is_option(ty: &Type) -> bool {
    let Type::Path(type_path) = ty else {
        return false;
    };
    let Some(last) = type_path.path.segments.last() else {
        return false;
    };
    if last.ident != "Option" {
        return false;
    }
    match &last.arguments {
        PathArguments::AngleBracketed(args) => {
            args.args.len() == 1 && matches!(args.args[0], GenericArgument::Type(_))
        }
        _ => false,
    }
}

/// Template field names are ASCII letters, digits and underscores.
fn validate_name(name: &str, attr: &FieldAttr, field: &syn::Field) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        return Ok(());
    }
    let span = if attr.rename.is_some() {
        attr.span
    } else {
        field.span()
    };
    Err(Error::new(
        span,
        format!(
            "'{}' is not a valid template field name (use letters, digits and '_')",
            name
        ),
    ))
}

/// Convert a string to SCREAMING_SNAKE_CASE.
fn to_screaming_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_was_lower = false;

    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_was_lower {
                result.push('_');
            }
            result.push(c);
            prev_was_lower = false;
        } else if c == '_' {
            result.push('_');
            prev_was_lower = false;
        } else {
            result.push(c.to_ascii_uppercase());
            prev_was_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }

    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(input: DeriveInput) -> Result<String> {
        fields_derive_impl(input).map(|tokens| tokens.to_string())
    }

    #[test]
    fn test_screaming_snake_case() {
        assert_eq!(to_screaming_snake_case("name"), "NAME");
        assert_eq!(to_screaming_snake_case("created_at"), "CREATED_AT");
        assert_eq!(to_screaming_snake_case("createdAt"), "CREATED_AT");
        assert_eq!(to_screaming_snake_case("Total"), "TOTAL");
        assert_eq!(to_screaming_snake_case("row2Col"), "ROW2_COL");
        assert_eq!(to_screaming_snake_case("1st"), "_1ST");
    }

    #[test]
    fn test_is_option() {
        assert!(is_option(&syn::parse_quote!(Option<String>)));
        assert!(is_option(&syn::parse_quote!(std::option::Option<u32>)));
        assert!(!is_option(&syn::parse_quote!(Vec<String>)));
        assert!(!is_option(&syn::parse_quote!(Option)));
        assert!(!is_option(&syn::parse_quote!(&str)));
    }

    #[test]
    fn test_rejects_enum() {
        let input: DeriveInput = syn::parse_quote! {
            enum Color { Red }
        };
        let err = expand(input).unwrap_err();
        assert!(err.to_string().contains("only be derived for structs"));
    }

    #[test]
    fn test_rejects_tuple_struct() {
        let input: DeriveInput = syn::parse_quote! {
            struct Pair(u32, u32);
        };
        assert!(expand(input).is_err());
    }

    #[test]
    fn test_rejects_invalid_rename() {
        let input: DeriveInput = syn::parse_quote! {
            struct Row {
                #[field(rename = "not valid")]
                a: u32,
            }
        };
        let err = expand(input).unwrap_err();
        assert!(err.to_string().contains("not a valid template field name"));
    }

    #[test]
    fn test_skipped_field_not_generated() {
        let input: DeriveInput = syn::parse_quote! {
            struct Row {
                shown: u32,
                #[field(skip)]
                hidden: u32,
            }
        };
        let tokens = expand(input).unwrap();
        assert!(tokens.contains("SHOWN"));
        assert!(!tokens.contains("HIDDEN"));
    }

    #[test]
    fn test_generics_carried_through() {
        let input: DeriveInput = syn::parse_quote! {
            struct Wrapper<T: std::fmt::Display> {
                value: T,
            }
        };
        let tokens = expand(input).unwrap().replace(' ', "");
        assert!(tokens.contains("impl<T:std::fmt::Display>::stanza::FieldSourceforWrapper<T>"));
    }
}
