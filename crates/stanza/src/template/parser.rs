//! Section table construction, validation and tree building.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};

use super::fragment::Fragment;
use super::tokenizer::{prefix_start, suffix_end, FieldScanner, Piece, TagKind, TagScanner};
use super::{ShapeId, TemplateNode, ROOT_NAME};

/// Byte positions of one tag and the whitespace it absorbs.
#[derive(Debug, Clone, Copy)]
struct TagSpan {
    prefix_start: usize,
    start: usize,
    end: usize,
    suffix_end: usize,
}

impl TagSpan {
    /// `floor` is where the previous tag's suffix ended; whitespace shared by
    /// two tags belongs to the earlier one.
    fn new(input: &str, start: usize, end: usize, floor: usize) -> Self {
        Self {
            prefix_start: prefix_start(input, start, floor),
            start,
            end,
            suffix_end: suffix_end(input, end),
        }
    }
}

/// A section as seen while scanning, possibly still open.
#[derive(Debug)]
struct SectionRecord<'a> {
    name: &'a str,
    literal: bool,
    open: TagSpan,
    close: Option<TagSpan>,
}

/// A fully matched section.
#[derive(Debug)]
struct Section<'a> {
    name: &'a str,
    literal: bool,
    open: TagSpan,
    close: TagSpan,
}

/// Parses `input` into the root node of a template tree.
pub(crate) fn parse(input: &str) -> Result<Arc<TemplateNode>> {
    let records = scan_sections(input)?;
    let sections = validate(records)?;

    let builder = TreeBuilder {
        input,
        sections: &sections,
    };
    let root = builder.build_root();

    tracing::debug!(
        sections = sections.len(),
        bytes = input.len(),
        "parsed template"
    );
    Ok(root)
}

/// Pairs up open and close tags by name.
fn scan_sections(input: &str) -> Result<Vec<SectionRecord<'_>>> {
    let mut records: Vec<SectionRecord<'_>> = Vec::new();
    let mut by_name: HashMap<&str, usize> = HashMap::new();
    let mut open_literal: Option<&str> = None;
    let mut absorbed = 0;

    for tag in TagScanner::new(input) {
        // Inside a literal section only its own closing tag is recognized
        if let Some(literal) = open_literal {
            if tag.kind != TagKind::Literal || tag.name != literal {
                tracing::trace!(name = tag.name, at = tag.start, "tag inside literal ignored");
                continue;
            }
        }

        let span = TagSpan::new(input, tag.start, tag.end, absorbed);
        absorbed = span.suffix_end;
        match by_name.get(tag.name) {
            None => {
                tracing::trace!(name = tag.name, at = tag.start, "section opened");
                by_name.insert(tag.name, records.len());
                let literal = tag.kind == TagKind::Literal;
                if literal {
                    open_literal = Some(tag.name);
                }
                records.push(SectionRecord {
                    name: tag.name,
                    literal,
                    open: span,
                    close: None,
                });
            }
            Some(&index) => {
                let record = &mut records[index];
                if record.close.is_some() {
                    return Err(Error::DuplicateClose {
                        name: tag.name.to_string(),
                    });
                }
                tracing::trace!(name = tag.name, at = tag.start, "section closed");
                record.close = Some(span);
                if open_literal == Some(tag.name) {
                    open_literal = None;
                }
            }
        }
    }

    Ok(records)
}

/// Checks every record is closed, well ordered and properly nested.
fn validate(records: Vec<SectionRecord<'_>>) -> Result<Vec<Section<'_>>> {
    let mut sections = Vec::with_capacity(records.len());
    for record in records {
        let close = record.close.ok_or_else(|| Error::MissingTag {
            name: record.name.to_string(),
        })?;
        if close.start <= record.open.start {
            return Err(Error::InvalidRange {
                name: record.name.to_string(),
            });
        }
        sections.push(Section {
            name: record.name,
            literal: record.literal,
            open: record.open,
            close,
        });
    }

    sections.sort_by_key(|s| s.open.start);

    for (i, outer) in sections.iter().enumerate() {
        for inner in &sections[i + 1..] {
            if inner.open.start > outer.close.start {
                break;
            }
            if inner.close.start > outer.close.start {
                return Err(Error::ImproperlyNested {
                    outer: outer.name.to_string(),
                    inner: inner.name.to_string(),
                });
            }
        }
    }

    Ok(sections)
}

struct TreeBuilder<'a> {
    input: &'a str,
    /// Sorted by opening position.
    sections: &'a [Section<'a>],
}

impl<'a> TreeBuilder<'a> {
    fn build_root(&self) -> Arc<TemplateNode> {
        let fragments = self.build_range(0, self.input.len(), Vec::new());
        Arc::new(self.finish(ROOT_NAME, fragments, self.input.len()))
    }

    fn build_section(&self, section: &Section<'a>) -> Arc<TemplateNode> {
        let mut fragments = Vec::new();
        self.push_tag(&mut fragments, section.name, &section.open);
        let mut fragments =
            self.build_range(section.open.suffix_end, section.close.prefix_start, fragments);
        self.push_tag(&mut fragments, section.name, &section.close);

        let raw_len = section.close.suffix_end - section.open.prefix_start;
        Arc::new(self.finish(section.name, fragments, raw_len))
    }

    /// Sections directly inside `[lo, hi)`, in source order.
    fn direct_children(&self, lo: usize, hi: usize) -> Vec<&'a Section<'a>> {
        let mut children = Vec::new();
        let mut after = lo;
        for section in self.sections {
            if section.open.start >= hi {
                break;
            }
            if section.open.start < after {
                continue;
            }
            children.push(section);
            after = section.close.end;
        }
        children
    }

    /// Appends the fragments of `[lo, hi)` to `fragments`, building children
    /// along the way.
    fn build_range(&self, lo: usize, hi: usize, mut fragments: Vec<Fragment>) -> Vec<Fragment> {
        let mut cursor = lo;

        for child in self.direct_children(lo, hi) {
            self.push_text(&mut fragments, cursor, child.open.prefix_start);

            if child.literal {
                self.push_tag(&mut fragments, child.name, &child.open);
                fragments.push(Fragment::Literal {
                    name: child.name.to_string(),
                    raw: self.input[child.open.suffix_end..child.close.prefix_start].to_string(),
                });
                self.push_tag(&mut fragments, child.name, &child.close);
            } else {
                fragments.push(Fragment::SectionPlaceholder(child.name.to_string()));
            }

            cursor = child.close.suffix_end;
        }

        self.push_text(&mut fragments, cursor, hi);
        fragments
    }

    fn push_tag(&self, fragments: &mut Vec<Fragment>, name: &str, span: &TagSpan) {
        fragments.push(Fragment::Prefix {
            name: name.to_string(),
            whitespace: self.input[span.prefix_start..span.start].to_string(),
        });
        fragments.push(Fragment::SectionTag {
            name: name.to_string(),
            raw: self.input[span.start..span.end].to_string(),
        });
        fragments.push(Fragment::Suffix {
            name: name.to_string(),
            whitespace: self.input[span.end..span.suffix_end].to_string(),
        });
    }

    fn push_text(&self, fragments: &mut Vec<Fragment>, lo: usize, hi: usize) {
        if lo >= hi {
            return;
        }
        for piece in FieldScanner::new(&self.input[lo..hi]) {
            match piece {
                Piece::Text(text) => fragments.push(Fragment::Text(text.to_string())),
                Piece::Field(name) => fragments.push(Fragment::Field(name.to_string())),
            }
        }
    }

    fn finish(&self, name: &str, fragments: Vec<Fragment>, raw_len: usize) -> TemplateNode {
        let mut children = HashMap::new();
        let mut field_names: Vec<String> = Vec::new();

        for fragment in &fragments {
            match fragment {
                Fragment::SectionPlaceholder(child) => {
                    if let Some(section) = self.sections.iter().find(|s| s.name == child) {
                        children.insert(child.clone(), self.build_section(section));
                    }
                }
                Fragment::Field(field) if !field_names.contains(field) => {
                    field_names.push(field.clone());
                }
                _ => {}
            }
        }

        let is_empty = !fragments
            .iter()
            .any(|f| matches!(f, Fragment::Text(text) if !text.is_empty()));
        let is_single_line = children.is_empty() && !own_tags_break_lines(name, &fragments);
        let inline_literals = fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Literal { name, .. } => Some(name),
                _ => None,
            })
            .filter(|literal| {
                !own_tags_break_lines(literal, fragments.iter().filter(|f| owned_by(f, literal)))
            })
            .cloned()
            .collect();

        TemplateNode {
            name: name.to_string(),
            shape_id: ShapeId::next(),
            fragments,
            children,
            field_names,
            raw_len,
            is_empty,
            is_single_line,
            inline_literals,
        }
    }
}

/// Whether any fragment breaks a line, ignoring the closing tag's own
/// prefix and suffix.
fn own_tags_break_lines<'f>(
    name: &str,
    fragments: impl IntoIterator<Item = &'f Fragment>,
) -> bool {
    let mut prefixes_seen = 0;
    let mut suffixes_seen = 0;

    fragments.into_iter().any(|fragment| match fragment {
        Fragment::Prefix { name: owner, .. } if owner == name => {
            prefixes_seen += 1;
            prefixes_seen == 1 && fragment.has_line_break()
        }
        Fragment::Suffix { name: owner, .. } if owner == name => {
            suffixes_seen += 1;
            suffixes_seen == 1 && fragment.has_line_break()
        }
        other => other.has_line_break(),
    })
}

/// Fragments a literal section contributes to its parent.
fn owned_by(fragment: &Fragment, literal: &str) -> bool {
    match fragment {
        Fragment::Prefix { name, .. }
        | Fragment::Suffix { name, .. }
        | Fragment::SectionTag { name, .. }
        | Fragment::Literal { name, .. } => name == literal,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(input: &str) -> Vec<(String, bool)> {
        scan_sections(input)
            .unwrap()
            .into_iter()
            .map(|r| (r.name.to_string(), r.close.is_some()))
            .collect()
    }

    mod scanning {
        use super::*;

        #[test]
        fn pairs_tags_by_name() {
            let input = "<!-- @@A@@ --><!-- @@B@@ --><!-- @@B@@ --><!-- @@A@@ -->";
            assert_eq!(
                names(input),
                vec![("A".to_string(), true), ("B".to_string(), true)]
            );
        }

        #[test]
        fn third_tag_is_duplicate_close() {
            let input = "<!-- @@A@@ --><!-- @@A@@ --><!-- @@A@@ -->";
            assert_eq!(
                scan_sections(input).unwrap_err(),
                Error::DuplicateClose {
                    name: "A".to_string()
                }
            );
        }

        #[test]
        fn literal_suppresses_other_tags() {
            let input = "<!-- ##L## --><!-- @@X@@ --><!-- ##L## -->";
            assert_eq!(names(input), vec![("L".to_string(), true)]);
        }

        #[test]
        fn literal_ignores_normal_tag_of_same_name() {
            let input = "<!-- ##L## --><!-- @@L@@ --><!-- ##L## -->";
            let records = scan_sections(input).unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].close.map(|c| c.start), Some(28));
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn crossing_sections_rejected() {
            let input = "<!-- @@A@@ --><!-- @@B@@ --><!-- @@A@@ --><!-- @@B@@ -->";
            let err = validate(scan_sections(input).unwrap()).unwrap_err();
            assert_eq!(
                err,
                Error::ImproperlyNested {
                    outer: "A".to_string(),
                    inner: "B".to_string(),
                }
            );
        }

        #[test]
        fn unclosed_section_rejected() {
            let input = "<!-- @@A@@ -->text";
            let err = validate(scan_sections(input).unwrap()).unwrap_err();
            assert_eq!(
                err,
                Error::MissingTag {
                    name: "A".to_string()
                }
            );
        }

        #[test]
        fn siblings_and_nesting_accepted() {
            let input = "<!-- @@A@@ --><!-- @@B@@ --><!-- @@B@@ --><!-- @@A@@ --><!-- @@C@@ --><!-- @@C@@ -->";
            let sections = validate(scan_sections(input).unwrap()).unwrap();
            assert_eq!(sections.len(), 3);
        }
    }

    mod single_line {
        use super::*;

        fn tag(name: &str, prefix: &str, suffix: &str) -> Vec<Fragment> {
            vec![
                Fragment::Prefix {
                    name: name.to_string(),
                    whitespace: prefix.to_string(),
                },
                Fragment::SectionTag {
                    name: name.to_string(),
                    raw: format!("<!-- @@{}@@ -->", name),
                },
                Fragment::Suffix {
                    name: name.to_string(),
                    whitespace: suffix.to_string(),
                },
            ]
        }

        #[test]
        fn closing_line_break_ignored() {
            let mut fragments = tag("R", "  ", "");
            fragments.push(Fragment::Text("x".to_string()));
            fragments.extend(tag("R", "", "\n"));
            assert!(!own_tags_break_lines("R", &fragments));
        }

        #[test]
        fn opening_line_break_counts() {
            let mut fragments = tag("R", "", "\n");
            fragments.push(Fragment::Text("x".to_string()));
            fragments.extend(tag("R", "", ""));
            assert!(own_tags_break_lines("R", &fragments));
        }

        #[test]
        fn text_line_break_counts() {
            let mut fragments = tag("R", "", "");
            fragments.push(Fragment::Text("x\n".to_string()));
            fragments.extend(tag("R", "", ""));
            assert!(own_tags_break_lines("R", &fragments));
        }
    }
}
