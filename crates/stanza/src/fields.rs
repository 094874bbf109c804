//! Turning data records into field values.
//!
//! [`FieldSource`] is the capability the writer's binding helpers
//! ([`Writer::set_fields`](crate::Writer::set_fields),
//! [`Writer::set_section_fields`](crate::Writer::set_section_fields)) consume:
//! an ordered list of `(name, formatted value)` pairs.
//!
//! Implement it by hand, derive it with `#[derive(Fields)]` (feature
//! `derive`), or go through serde with [`Serialized`] / [`fields_of`].
//!
//! ```rust
//! use stanza::{FieldSource, Template};
//! use serde_json::json;
//!
//! let template = Template::parse("@@name@@ is @@age@@").unwrap();
//! let mut writer = template.writer();
//! writer.set_fields(&json!({"name": "Ada", "age": 36, "ignored": true}));
//! assert_eq!(writer.get_content(false), "Ada is 36");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

/// A record that can be split into named field values.
pub trait FieldSource {
    /// Returns `(field name, formatted value)` pairs in a stable order.
    fn fields(&self) -> Vec<(String, String)>;
}

impl<T: FieldSource + ?Sized> FieldSource for &T {
    fn fields(&self) -> Vec<(String, String)> {
        (**self).fields()
    }
}

impl<T: FieldSource + ?Sized> FieldSource for Box<T> {
    fn fields(&self) -> Vec<(String, String)> {
        (**self).fields()
    }
}

/// Formats a JSON value as field text.
///
/// Strings are used as-is, null becomes empty, arrays and objects keep their
/// JSON form.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

impl FieldSource for Map<String, Value> {
    fn fields(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(name, value)| (name.clone(), format_value(value)))
            .collect()
    }
}

/// Objects yield their members; any other value yields nothing.
impl FieldSource for Value {
    fn fields(&self) -> Vec<(String, String)> {
        match self {
            Value::Object(map) => map.fields(),
            _ => Vec::new(),
        }
    }
}

impl<K: AsRef<str>, V: Display> FieldSource for BTreeMap<K, V> {
    fn fields(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.to_string()))
            .collect()
    }
}

/// Iteration order of a `HashMap` is unspecified, and so is the field order.
impl<K: AsRef<str>, V: Display, S> FieldSource for HashMap<K, V, S> {
    fn fields(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.to_string()))
            .collect()
    }
}

impl<K: AsRef<str>, V: Display> FieldSource for [(K, V)] {
    fn fields(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.to_string()))
            .collect()
    }
}

impl<K: AsRef<str>, V: Display> FieldSource for Vec<(K, V)> {
    fn fields(&self) -> Vec<(String, String)> {
        self.as_slice().fields()
    }
}

impl<K: AsRef<str>, V: Display, const N: usize> FieldSource for [(K, V); N] {
    fn fields(&self) -> Vec<(String, String)> {
        self.as_slice().fields()
    }
}

/// Extracts field values from any serializable value.
///
/// The value must serialize to an object (structs and maps do).
///
/// # Errors
///
/// Returns [`Error::Serialization`](crate::Error::Serialization) if
/// serialization fails.
pub fn fields_of<T: Serialize + ?Sized>(value: &T) -> Result<Vec<(String, String)>> {
    Ok(serde_json::to_value(value)?.fields())
}

/// Adapts a serializable value into a [`FieldSource`].
///
/// A value that fails to serialize yields no fields; the failure is logged.
///
/// ```rust
/// use serde::Serialize;
/// use stanza::{Serialized, Template};
///
/// #[derive(Serialize)]
/// struct Row { name: String }
///
/// let template = Template::parse("<!-- @@ROW@@ -->@@name@@;<!-- @@ROW@@ -->").unwrap();
/// let rows = [Row { name: "a".into() }, Row { name: "b".into() }];
///
/// let mut writer = template.writer();
/// writer.set_section_fields("ROW", rows.iter().map(Serialized)).unwrap();
/// assert_eq!(writer.get_content(false), "a;b;");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Serialized<T>(pub T);

impl<T: Serialize> FieldSource for Serialized<T> {
    fn fields(&self) -> Vec<(String, String)> {
        match fields_of(&self.0) {
            Ok(fields) => fields,
            Err(err) => {
                tracing::warn!("unable to serialize field source: {}", err);
                Vec::new()
            }
        }
    }
}

/// Special handling for a field when it is bound through the binding
/// helpers.
///
/// Rules never affect [`Writer::set_field`](crate::Writer::set_field).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRule {
    /// Boolean-ish field: renders `marker` for a truthy value and nothing
    /// otherwise. Truthy values are `true`, `1`, `yes`, `on`, `checked` and
    /// `selected`, ignoring case.
    Flag { marker: String },
    /// Choice field: only values listed in `options` are bound; any other
    /// value leaves the field unset.
    Choice { options: Vec<String> },
}

impl FieldRule {
    /// Shorthand for a `checked` flag.
    pub fn checked() -> Self {
        FieldRule::Flag {
            marker: "checked".to_string(),
        }
    }

    /// Shorthand for a `selected` flag.
    pub fn selected() -> Self {
        FieldRule::Flag {
            marker: "selected".to_string(),
        }
    }

    pub fn choice<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldRule::Choice {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// Maps a raw value to what gets bound, or `None` when the value is
    /// rejected.
    pub fn apply(&self, value: &str) -> Option<String> {
        match self {
            FieldRule::Flag { marker } => {
                if is_truthy(value) {
                    Some(marker.clone())
                } else {
                    Some(String::new())
                }
            }
            FieldRule::Choice { options } => options
                .iter()
                .any(|option| option == value)
                .then(|| value.to_string()),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    const TRUTHY: &[&str] = &["true", "1", "yes", "on", "checked", "selected"];
    let value = value.trim();
    TRUTHY.iter().any(|t| t.eq_ignore_ascii_case(value))
}
