//! Low-level scanning of section tags and field placeholders.
//!
//! Two token shapes are recognized:
//!
//! - Section tags: `<!-- @@NAME@@ -->` (normal) and `<!-- ##NAME## -->` (literal).
//!   Spaces and tabs are allowed between the comment delimiters and the marker.
//! - Field placeholders: `@@NAME@@` anywhere outside a tag.
//!
//! Names are one or more ASCII letters, digits or underscores.

const TAG_OPEN: &str = "<!--";
const TAG_CLOSE: &str = "-->";
const SECTION_MARKER: &str = "@@";
const LITERAL_MARKER: &str = "##";
const FIELD_MARKER: &str = "@@";

/// Which kind of section a tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    /// Normal section: content is tokenized into fields and child sections.
    Section,
    /// Literal section: content is kept verbatim.
    Literal,
}

/// A recognized section tag and its byte range in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TagToken<'a> {
    pub kind: TagKind,
    pub name: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Checks whether `s` is a valid section or field name.
pub(crate) fn is_valid_name(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_name_byte)
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_horizontal_space(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Iterator over every section tag in a string, in source order.
pub(crate) struct TagScanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> TagScanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Tries to match a complete tag starting exactly at `start`.
    fn match_tag(&self, start: usize) -> Option<TagToken<'a>> {
        let bytes = self.input.as_bytes();
        let mut i = start + TAG_OPEN.len();

        while i < bytes.len() && is_horizontal_space(bytes[i]) {
            i += 1;
        }

        let rest = &self.input[i..];
        let (kind, marker) = if rest.starts_with(SECTION_MARKER) {
            (TagKind::Section, SECTION_MARKER)
        } else if rest.starts_with(LITERAL_MARKER) {
            (TagKind::Literal, LITERAL_MARKER)
        } else {
            return None;
        };
        i += marker.len();

        let name_start = i;
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        let name = &self.input[name_start..i];
        if !is_valid_name(name) || !self.input[i..].starts_with(marker) {
            return None;
        }
        i += marker.len();

        while i < bytes.len() && is_horizontal_space(bytes[i]) {
            i += 1;
        }
        if !self.input[i..].starts_with(TAG_CLOSE) {
            return None;
        }

        Some(TagToken {
            kind,
            name,
            start,
            end: i + TAG_CLOSE.len(),
        })
    }
}

impl<'a> Iterator for TagScanner<'a> {
    type Item = TagToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.input.len() {
            let offset = self.input[self.pos..].find(TAG_OPEN)?;
            let start = self.pos + offset;

            if let Some(tag) = self.match_tag(start) {
                self.pos = tag.end;
                return Some(tag);
            }
            // Not a tag: step past this comment opener and keep looking
            self.pos = start + 1;
        }
        None
    }
}

/// A run of section text split into literal text and field placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Piece<'a> {
    Text(&'a str),
    Field(&'a str),
}

/// Iterator splitting tag-free text into [`Piece`]s.
pub(crate) struct FieldScanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> FieldScanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Finds the next placeholder at or after `from`, returning its byte range.
    fn find_field(&self, from: usize) -> Option<(usize, usize)> {
        let bytes = self.input.as_bytes();
        let mut search = from;

        while let Some(offset) = self.input[search..].find(FIELD_MARKER) {
            let start = search + offset;
            let name_start = start + FIELD_MARKER.len();
            let mut i = name_start;
            while i < bytes.len() && is_name_byte(bytes[i]) {
                i += 1;
            }
            if is_valid_name(&self.input[name_start..i])
                && self.input[i..].starts_with(FIELD_MARKER)
            {
                return Some((start, i + FIELD_MARKER.len()));
            }
            search = start + 1;
        }
        None
    }
}

impl<'a> Iterator for FieldScanner<'a> {
    type Item = Piece<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.input.len() {
            return None;
        }

        match self.find_field(self.pos) {
            Some((start, _)) if start > self.pos => {
                let text = &self.input[self.pos..start];
                self.pos = start;
                Some(Piece::Text(text))
            }
            Some((start, end)) => {
                let name = &self.input[start + FIELD_MARKER.len()..end - FIELD_MARKER.len()];
                self.pos = end;
                Some(Piece::Field(name))
            }
            None => {
                let text = &self.input[self.pos..];
                self.pos = self.input.len();
                Some(Piece::Text(text))
            }
        }
    }
}

/// Start of the whitespace absorbed in front of a tag.
///
/// The run of spaces/tabs directly before the tag, never reaching below
/// `floor` (the end of whatever the previous tag absorbed).
pub(crate) fn prefix_start(input: &str, tag_start: usize, floor: usize) -> usize {
    let bytes = input.as_bytes();
    let mut i = tag_start;
    while i > floor && is_horizontal_space(bytes[i - 1]) {
        i -= 1;
    }
    i
}

/// End of the whitespace absorbed after a tag.
///
/// The run of spaces/tabs directly after the tag plus at most one line break
/// (`\n` or `\r\n`).
pub(crate) fn suffix_end(input: &str, tag_end: usize) -> usize {
    let bytes = input.as_bytes();
    let mut i = tag_end;
    while i < bytes.len() && is_horizontal_space(bytes[i]) {
        i += 1;
    }
    match bytes.get(i) {
        Some(b'\n') => i + 1,
        Some(b'\r') if bytes.get(i + 1) == Some(&b'\n') => i + 2,
        _ => i,
    }
}
