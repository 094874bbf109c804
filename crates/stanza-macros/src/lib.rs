//! Proc macros for Stanza.
//!
//! - [`Fields`] - Implement `stanza::FieldSource` for a named-field struct
//!
//! Use them through the `derive` feature of `stanza`, which re-exports
//! [`Fields`] as `stanza::Fields`.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod fields;

/// Derives `stanza::FieldSource` for a struct with named fields.
///
/// Every field becomes one template field, named after the Rust field and
/// formatted with `Display`. The derive also adds a `SCREAMING_SNAKE_CASE`
/// constant per field holding its template name.
///
/// # Field Attributes
///
/// | Attribute | Effect |
/// |-----------|--------|
/// | `#[field(skip)]` | Field is not bound |
/// | `#[field(rename = "Name")]` | Template field name |
/// | `#[field(format = "{:>8.2}")]` | `format!` string for the value |
/// | `#[field(with = path::to::fn)]` | `fn(&T) -> String` producing the value |
///
/// `Option<T>` fields render an empty string when `None`; `format` then
/// applies to the inner value.
///
/// # Example
///
/// ```ignore
/// use stanza::Fields;
///
/// fn yes_no(value: &bool) -> String {
///     if *value { "yes".into() } else { "no".into() }
/// }
///
/// #[derive(Fields)]
/// struct Invoice {
///     #[field(rename = "Customer")]
///     customer: String,
///     #[field(format = "{:.2}")]
///     total: f64,
///     #[field(with = yes_no)]
///     paid: bool,
///     note: Option<String>,
///     #[field(skip)]
///     id: u64,
/// }
///
/// assert_eq!(Invoice::CUSTOMER, "Customer");
/// ```
#[proc_macro_derive(Fields, attributes(field))]
pub fn fields_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    fields::fields_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
