//! Error types for parsing and writing templates.

use thiserror::Error;

/// Errors raised while parsing a template or driving a [`Writer`](crate::Writer).
///
/// Parse errors (`ImproperlyNested`, `MissingTag`, `DuplicateClose`,
/// `InvalidRange`) are fatal: a document parses wholly or not at all.
/// Writer errors signal programming mistakes and are never swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Two sections cross each other instead of nesting.
    #[error("section '{inner}' is improperly nested inside section '{outer}'")]
    ImproperlyNested { outer: String, inner: String },

    /// A section was opened but never closed.
    #[error("section '{name}' is missing its closing tag")]
    MissingTag { name: String },

    /// A section tag appeared a third time after the section was closed.
    #[error("section '{name}' has already been closed")]
    DuplicateClose { name: String },

    /// A section closes at or before the point where it opens.
    #[error("section '{name}' has an invalid range")]
    InvalidRange { name: String },

    /// No section with this name exists where it was looked up.
    #[error("section not found: {0}")]
    SectionNotFound(String),

    /// The selected section declares no such field.
    #[error("field '{field}' not found in section '{section}'")]
    FieldNotFound { section: String, field: String },

    /// No provider is registered for the field in the selected section.
    #[error("no provider registered for field '{field}' in section '{section}'")]
    ProviderNotFound { section: String, field: String },

    /// The operation is not legal in the writer's current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A loader has no text for the requested key.
    #[error("template source not found: {0}")]
    NotFound(String),

    /// Data could not be converted into field values.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MissingTag {
            name: "ROW".to_string(),
        };
        assert!(err.to_string().contains("ROW"));
        assert!(err.to_string().contains("closing tag"));
    }

    #[test]
    fn test_nesting_display_names_both_sections() {
        let err = Error::ImproperlyNested {
            outer: "A".to_string(),
            inner: "B".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'A'"));
        assert!(msg.contains("'B'"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
