//! Stanza - section-based text templates.
//!
//! A Stanza template is ordinary text (HTML, config files, reports) marked up
//! with comment tags. Sections can be repeated once per data row, fields are
//! filled with values, and whole sub-documents (*providers*) can be spliced
//! into a single field. Output keeps the source formatting byte for byte.
//!
//! - [`Template`]: the parsed, immutable section tree. Parse once, share
//!   freely.
//! - [`Writer`]: a single rendering session with a selection stack.
//! - [`FieldSource`]: records that bind many fields at once.
//! - [`TemplateRegistry`]: parse-once cache over a [`TextLoader`].
//!
//! # Quick Start
//!
//! ```rust
//! use stanza::Template;
//!
//! let template = Template::parse(
//!     "<!-- @@ROW@@ -->X:@@Name@@\n<!-- @@ROW@@ -->",
//! )?;
//!
//! let mut writer = template.writer();
//! writer.select_section("ROW")?;
//! for name in ["A", "B"] {
//!     writer.set_field("Name", name)?;
//!     writer.append_section(false)?;
//! }
//!
//! assert_eq!(writer.get_content(false), "X:A\nX:B\n");
//! # Ok::<(), stanza::Error>(())
//! ```
//!
//! # Tags
//!
//! | Markup | Meaning |
//! |--------|---------|
//! | `<!-- @@NAME@@ -->` | Opens, then closes, section `NAME` |
//! | `<!-- ##NAME## -->` | Opens, then closes, literal section `NAME` |
//! | `@@name@@` | Field placeholder |
//!
//! Names are ASCII letters, digits and underscores. Section names are unique
//! within a document. Content of a literal section is never interpreted.
//!
//! # Deriving Fields
//!
//! With the `derive` feature, `#[derive(Fields)]` implements [`FieldSource`]
//! for named-field structs:
//!
//! ```rust,ignore
//! use stanza::Fields;
//!
//! #[derive(Fields)]
//! struct Row {
//!     name: String,
//!     #[field(rename = "Total", format = "{:.2}")]
//!     total: f64,
//!     #[field(skip)]
//!     internal: u64,
//! }
//! ```
//!
//! # Logging
//!
//! Parse summaries, skipped bindings and rejected provider registrations are
//! reported through [`tracing`]. No subscriber is installed.

mod error;
pub mod fields;
pub mod registry;
pub mod template;
pub mod writer;

pub use error::{Error, Result};
pub use fields::{fields_of, format_value, FieldRule, FieldSource, Serialized};
pub use registry::{TemplateCache, TemplateRegistry, TextLoader};
pub use template::{Fragment, InstanceId, ShapeId, Template, ROOT_NAME};
pub use writer::{LiteralHook, Verbatim, Writer};

#[cfg(feature = "derive")]
pub use stanza_macros::Fields;
