//! Parsing of `#[field(...)]` attributes.

use proc_macro2::Span;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Error, Expr, ExprLit, ExprPath, Lit, Meta, Path, Result, Token,
};

/// Field-level attributes from `#[field(...)]`.
#[derive(Debug, Clone)]
pub struct FieldAttr {
    pub skip: bool,
    /// Template field name (default: the Rust field name).
    pub rename: Option<String>,
    /// `format!` string applied to the value.
    pub format: Option<String>,
    /// Function turning `&T` into the field text.
    pub with: Option<Path>,
    pub span: Span,
}

impl Default for FieldAttr {
    fn default() -> Self {
        FieldAttr {
            skip: false,
            rename: None,
            format: None,
            with: None,
            span: Span::call_site(),
        }
    }
}

fn string_value(expr: &Expr, key: &str) -> Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        _ => Err(Error::new(
            expr.span(),
            format!("{} must be a string literal", key),
        )),
    }
}

impl Parse for FieldAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = FieldAttr {
            span: input.span(),
            ..FieldAttr::default()
        };

        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::Path(p) if p.is_ident("skip") => attr.skip = true,

                Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                    attr.rename = Some(string_value(&nv.value, "rename")?);
                }

                Meta::NameValue(nv) if nv.path.is_ident("format") => {
                    attr.format = Some(string_value(&nv.value, "format")?);
                }

                // with = path, or with = "path" for paths that do not parse as
                // an expression
                Meta::NameValue(nv) if nv.path.is_ident("with") => {
                    attr.with = Some(match &nv.value {
                        Expr::Path(ExprPath { path, .. }) => path.clone(),
                        Expr::Lit(ExprLit {
                            lit: Lit::Str(s), ..
                        }) => s.parse()?,
                        other => {
                            return Err(Error::new(
                                other.span(),
                                "with must be a function path",
                            ))
                        }
                    });
                }

                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown field attribute. Expected: skip, rename = \"...\", format = \"...\", or with = path",
                    ));
                }
            }
        }

        if attr.format.is_some() && attr.with.is_some() {
            return Err(Error::new(
                attr.span,
                "format and with cannot be combined",
            ));
        }

        Ok(attr)
    }
}

/// Extract `#[field(...)]` attributes from a struct field.
pub fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttr> {
    for attr in attrs {
        if attr.path().is_ident("field") {
            return attr.parse_args::<FieldAttr>();
        }
    }
    Ok(FieldAttr::default())
}
