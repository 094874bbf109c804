//! Implementation of the `#[derive(Fields)]` macro.
//!
//! Generates a `stanza::FieldSource` implementation and field name constants
//! from a named-field struct.

mod attrs;
mod derive;

pub use derive::fields_derive_impl;
