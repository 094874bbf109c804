//! Typed pieces of section text.

/// One piece of a section's source text, in parse order.
///
/// Concatenating the source form of every fragment (with each
/// [`Fragment::SectionPlaceholder`] replaced by its child section's source)
/// reproduces the original document byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Static text, emitted verbatim.
    Text(String),
    /// A `@@name@@` field placeholder.
    Field(String),
    /// The raw text of a section tag, never emitted when rendering.
    SectionTag { name: String, raw: String },
    /// Whitespace absorbed in front of a section tag.
    Prefix { name: String, whitespace: String },
    /// Whitespace (and one line break) absorbed after a section tag.
    Suffix { name: String, whitespace: String },
    /// Position of a child section inside its parent.
    SectionPlaceholder(String),
    /// Verbatim inner text of a literal section.
    Literal { name: String, raw: String },
}

impl Fragment {
    /// Source text of this fragment.
    ///
    /// Returns `None` for [`Fragment::SectionPlaceholder`], whose source lives
    /// in the child section.
    pub fn source(&self) -> Option<std::borrow::Cow<'_, str>> {
        use std::borrow::Cow;

        match self {
            Fragment::Text(text) => Some(Cow::Borrowed(text)),
            Fragment::Field(name) => Some(Cow::Owned(format!("@@{}@@", name))),
            Fragment::SectionTag { raw, .. } => Some(Cow::Borrowed(raw)),
            Fragment::Prefix { whitespace, .. } | Fragment::Suffix { whitespace, .. } => {
                Some(Cow::Borrowed(whitespace))
            }
            Fragment::Literal { raw, .. } => Some(Cow::Borrowed(raw)),
            Fragment::SectionPlaceholder(_) => None,
        }
    }

    pub(crate) fn has_line_break(&self) -> bool {
        self.source()
            .map(|s| s.contains(['\n', '\r']))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_source_is_bracketed() {
        let fragment = Fragment::Field("Name".to_string());
        assert_eq!(fragment.source().as_deref(), Some("@@Name@@"));
    }

    #[test]
    fn placeholder_has_no_source() {
        let fragment = Fragment::SectionPlaceholder("ROW".to_string());
        assert!(fragment.source().is_none());
        assert!(!fragment.has_line_break());
    }

    #[test]
    fn line_break_detection() {
        let suffix = Fragment::Suffix {
            name: "ROW".to_string(),
            whitespace: " \r\n".to_string(),
        };
        assert!(suffix.has_line_break());
        assert!(!Fragment::Text("abc".to_string()).has_line_break());
    }
}
