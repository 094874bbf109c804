//! Parsed, immutable section trees.
//!
//! A [`Template`] is built once from source text and then shared: copying it
//! only clones an [`Arc`] and assigns a fresh [`InstanceId`], so any number of
//! [`Writer`](crate::Writer)s can be derived from a single parse.
//!
//! ## Source Format
//!
//! ```text
//! <ul>
//! <!-- @@ITEM@@ -->
//!   <li>@@label@@</li>
//! <!-- @@ITEM@@ -->
//! </ul>
//! <!-- ##SCRIPT## -->
//! <script>if (a @@b@@) {}</script>
//! <!-- ##SCRIPT## -->
//! ```
//!
//! - `<!-- @@NAME@@ -->` opens a section the first time it appears and closes
//!   it the second time.
//! - `<!-- ##NAME## -->` does the same for a literal section, whose content is
//!   kept verbatim (no fields, no nested sections).
//! - `@@name@@` outside a tag is a field placeholder.
//!
//! Spaces and tabs in front of a tag (when the tag starts its line) and after
//! it, together with one line break, belong to the tag. They are dropped when
//! rendering so a section on its own lines leaves no blank lines behind.
//!
//! ## Round Trip
//!
//! `Display` reproduces the parsed source exactly:
//!
//! ```rust
//! use stanza::Template;
//!
//! let source = "<!-- @@ROW@@ -->X:@@Name@@\n<!-- @@ROW@@ -->";
//! let template = Template::parse(source).unwrap();
//! assert_eq!(template.to_string(), source);
//! ```

mod fragment;
mod parser;
mod tokenizer;

pub use fragment::Fragment;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::writer::Writer;

/// Section name given to the root of every template.
///
/// Not a valid tag name, so it never collides with a user section.
pub const ROOT_NAME: &str = "#document";

static NEXT_SHAPE: AtomicU64 = AtomicU64::new(1);
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Identifies the parsed section a template (or writer) was derived from.
///
/// Every copy of the same parsed section shares its shape id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(u64);

impl ShapeId {
    pub(crate) fn next() -> Self {
        ShapeId(NEXT_SHAPE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identifies one particular template or writer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn next() -> Self {
        InstanceId(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Shared, immutable data of one parsed section.
#[derive(Debug)]
pub(crate) struct TemplateNode {
    name: String,
    shape_id: ShapeId,
    fragments: Vec<Fragment>,
    children: HashMap<String, Arc<TemplateNode>>,
    field_names: Vec<String>,
    raw_len: usize,
    is_empty: bool,
    is_single_line: bool,
    /// Literal sections whose tags and content share one line.
    inline_literals: Vec<String>,
}

impl TemplateNode {
    fn find(self: &Arc<Self>, name: &str) -> Option<Arc<TemplateNode>> {
        if let Some(child) = self.children.get(name) {
            return Some(Arc::clone(child));
        }
        self.children.values().find_map(|child| child.find(name))
    }

    fn write_source(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.fragments {
            match fragment {
                Fragment::SectionPlaceholder(name) => {
                    if let Some(child) = self.children.get(name) {
                        child.write_source(f)?;
                    }
                }
                other => {
                    if let Some(source) = other.source() {
                        f.write_str(&source)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// A parsed template: one section of a document and all of its descendants.
///
/// `Clone` behaves like [`Template::copy`]: the parsed data is shared and the
/// clone gets its own [`InstanceId`].
pub struct Template {
    node: Arc<TemplateNode>,
    instance_id: InstanceId,
}

impl Template {
    /// Parses source text into a template.
    ///
    /// # Errors
    ///
    /// - [`Error::ImproperlyNested`] when two sections cross.
    /// - [`Error::MissingTag`] when a section is never closed.
    /// - [`Error::DuplicateClose`] when a section tag appears a third time.
    /// - [`Error::InvalidRange`] when a section closes before it opens.
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self::from_node(parser::parse(source)?))
    }

    pub(crate) fn from_node(node: Arc<TemplateNode>) -> Self {
        Self {
            node,
            instance_id: InstanceId::next(),
        }
    }

    /// Returns a new handle on the same parsed data with a new instance id.
    pub fn copy(&self) -> Self {
        Self::from_node(Arc::clone(&self.node))
    }

    /// Returns a copy of the descendant section `name`.
    pub fn subtree(&self, name: &str) -> Result<Template> {
        self.node
            .find(name)
            .map(Self::from_node)
            .ok_or_else(|| Error::SectionNotFound(name.to_string()))
    }

    /// Returns a copy of the direct child section `name`, if any.
    pub fn child(&self, name: &str) -> Option<Template> {
        self.node
            .children
            .get(name)
            .map(|node| Self::from_node(Arc::clone(node)))
    }

    /// Whether a section called `name` exists anywhere below this one.
    pub fn contains_section(&self, name: &str) -> bool {
        self.node.find(name).is_some()
    }

    /// Names of the direct child sections, in source order.
    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.node.fragments.iter().filter_map(|f| match f {
            Fragment::SectionPlaceholder(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Field placeholders declared directly in this section, in source order.
    pub fn field_names(&self) -> &[String] {
        &self.node.field_names
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.node.field_names.iter().any(|f| f == name)
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.node.fragments
    }

    /// Length in bytes of this section's source, tags included.
    pub fn raw_len(&self) -> usize {
        self.node.raw_len
    }

    /// True when the section holds no static text.
    pub fn is_empty(&self) -> bool {
        self.node.is_empty
    }

    /// True for leaf sections written on a single line.
    ///
    /// Such a section keeps the whitespace around its tags when it renders
    /// data, so an inline row stays on its own indented line.
    pub fn is_single_line(&self) -> bool {
        self.node.is_single_line
    }

    /// True when literal section `name` sits inline in this section. Such a
    /// literal keeps the whitespace around its tags when rendered.
    pub fn is_inline_literal(&self, name: &str) -> bool {
        self.node.inline_literals.iter().any(|l| l == name)
    }

    pub fn shape_id(&self) -> ShapeId {
        self.node.shape_id
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Starts a new writing session over this template.
    pub fn writer(&self) -> Writer {
        Writer::new(self.copy())
    }

    #[cfg(test)]
    pub(crate) fn shares_node(&self, other: &Template) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl Clone for Template {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.node.name)
            .field("shape_id", &self.node.shape_id)
            .field("instance_id", &self.instance_id)
            .field("fields", &self.node.field_names)
            .field("children", &self.child_names().collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node.write_source(f)
    }
}

impl std::str::FromStr for Template {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Template::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = "head\n<!-- @@SECTION1@@ -->\none @@a@@\n  <!-- @@SECTION2@@ -->\n  two @@b@@\n  <!-- @@SECTION2@@ -->\n<!-- @@SECTION1@@ -->\ntail\n";

    mod structure {
        use super::*;

        #[test]
        fn root_holds_placeholder() {
            let template = Template::parse(NESTED).unwrap();
            assert_eq!(template.name(), ROOT_NAME);
            assert_eq!(template.child_names().collect::<Vec<_>>(), vec!["SECTION1"]);
            assert!(template.field_names().is_empty());
        }

        #[test]
        fn fields_belong_to_their_section() {
            let template = Template::parse(NESTED).unwrap();
            let one = template.subtree("SECTION1").unwrap();
            let two = template.subtree("SECTION2").unwrap();
            assert_eq!(one.field_names(), ["a".to_string()]);
            assert_eq!(two.field_names(), ["b".to_string()]);
            assert!(!one.has_field("b"));
        }

        #[test]
        fn section_fragments_start_and_end_with_own_tags() {
            let template = Template::parse(NESTED).unwrap();
            let two = template.subtree("SECTION2").unwrap();
            let fragments = two.fragments();
            assert_eq!(
                fragments[0],
                Fragment::Prefix {
                    name: "SECTION2".to_string(),
                    whitespace: "  ".to_string(),
                }
            );
            assert_eq!(
                fragments[fragments.len() - 1],
                Fragment::Suffix {
                    name: "SECTION2".to_string(),
                    whitespace: "\n".to_string(),
                }
            );
        }

        #[test]
        fn mid_line_section_owns_surrounding_spaces() {
            let template =
                Template::parse("Name: <!-- @@OPT@@ -->(@@x@@)<!-- @@OPT@@ --> end").unwrap();
            assert_eq!(
                template.fragments(),
                [
                    Fragment::Text("Name:".to_string()),
                    Fragment::SectionPlaceholder("OPT".to_string()),
                    Fragment::Text("end".to_string()),
                ]
            );
            let opt = template.subtree("OPT").unwrap();
            let fragments = opt.fragments();
            assert_eq!(
                fragments[0],
                Fragment::Prefix {
                    name: "OPT".to_string(),
                    whitespace: " ".to_string(),
                }
            );
            assert_eq!(
                fragments[fragments.len() - 1],
                Fragment::Suffix {
                    name: "OPT".to_string(),
                    whitespace: " ".to_string(),
                }
            );
            assert!(opt.is_single_line());
        }

        #[test]
        fn shared_spaces_go_to_earlier_tag() {
            let template =
                Template::parse("<!-- @@A@@ -->x<!-- @@A@@ -->  <!-- @@B@@ -->y<!-- @@B@@ -->")
                    .unwrap();
            let a = template.subtree("A").unwrap();
            let b = template.subtree("B").unwrap();
            assert_eq!(
                a.fragments().last(),
                Some(&Fragment::Suffix {
                    name: "A".to_string(),
                    whitespace: "  ".to_string(),
                })
            );
            assert_eq!(
                b.fragments().first(),
                Some(&Fragment::Prefix {
                    name: "B".to_string(),
                    whitespace: String::new(),
                })
            );
        }

        #[test]
        fn literal_is_single_fragment() {
            let source = "<!-- ##RAW## -->\n<!-- @@X@@ -->@@y@@\n<!-- ##RAW## -->\n";
            let template = Template::parse(source).unwrap();
            assert!(template.child_names().next().is_none());
            assert!(template.field_names().is_empty());
            assert!(template.fragments().contains(&Fragment::Literal {
                name: "RAW".to_string(),
                raw: "<!-- @@X@@ -->@@y@@\n".to_string(),
            }));
            assert!(!template.contains_section("X"));
        }

        #[test]
        fn missing_subtree() {
            let template = Template::parse(NESTED).unwrap();
            assert_eq!(
                template.subtree("NOPE").unwrap_err(),
                Error::SectionNotFound("NOPE".to_string())
            );
        }

        #[test]
        fn raw_len_covers_tags_and_whitespace() {
            let source = "a\n<!-- @@R@@ -->\nb\n<!-- @@R@@ -->\nc";
            let template = Template::parse(source).unwrap();
            assert_eq!(template.raw_len(), source.len());
            let row = template.subtree("R").unwrap();
            assert_eq!(row.raw_len(), "<!-- @@R@@ -->\nb\n<!-- @@R@@ -->\n".len());
            assert_eq!(row.to_string().len(), row.raw_len());
        }
    }

    mod flags {
        use super::*;

        #[test]
        fn empty_section() {
            let template = Template::parse("<!-- @@E@@ -->@@x@@<!-- @@E@@ -->").unwrap();
            assert!(template.subtree("E").unwrap().is_empty());
        }

        #[test]
        fn non_empty_section() {
            let template = Template::parse("<!-- @@E@@ -->x<!-- @@E@@ -->").unwrap();
            assert!(!template.subtree("E").unwrap().is_empty());
        }

        #[test]
        fn inline_row_is_single_line() {
            let template = Template::parse("  <!-- @@R@@ -->@@x@@<!-- @@R@@ -->\n").unwrap();
            assert!(template.subtree("R").unwrap().is_single_line());
        }

        #[test]
        fn block_row_is_not_single_line() {
            let template = Template::parse(NESTED).unwrap();
            assert!(!template.subtree("SECTION2").unwrap().is_single_line());
        }

        #[test]
        fn inline_literal() {
            let template = Template::parse("x <!-- ##L## -->y<!-- ##L## --> z").unwrap();
            assert!(template.is_inline_literal("L"));
            assert!(!template.is_inline_literal("M"));
        }

        #[test]
        fn block_literal_is_not_inline() {
            let template = Template::parse("<!-- ##L## -->\ny\n<!-- ##L## -->\n").unwrap();
            assert!(!template.is_inline_literal("L"));
        }

        #[test]
        fn parent_is_never_single_line() {
            let template =
                Template::parse("<!-- @@P@@ --><!-- @@C@@ -->x<!-- @@C@@ --><!-- @@P@@ -->")
                    .unwrap();
            assert!(!template.subtree("P").unwrap().is_single_line());
            assert!(template.subtree("C").unwrap().is_single_line());
        }
    }

    mod identity {
        use super::*;

        #[test]
        fn copy_keeps_shape_and_renews_instance() {
            let template = Template::parse(NESTED).unwrap();
            let copy = template.copy();
            assert_eq!(copy.shape_id(), template.shape_id());
            assert_ne!(copy.instance_id(), template.instance_id());
            assert!(copy.shares_node(&template));
        }

        #[test]
        fn clone_behaves_like_copy() {
            let template = Template::parse(NESTED).unwrap();
            #[allow(clippy::redundant_clone)]
            let clone = template.clone();
            assert_eq!(clone.shape_id(), template.shape_id());
            assert_ne!(clone.instance_id(), template.instance_id());
        }

        #[test]
        fn subtrees_share_shape() {
            let template = Template::parse(NESTED).unwrap();
            let a = template.subtree("SECTION2").unwrap();
            let b = template.subtree("SECTION2").unwrap();
            assert_eq!(a.shape_id(), b.shape_id());
            assert_ne!(a.shape_id(), template.shape_id());
        }

        #[test]
        fn separate_parses_differ_in_shape() {
            let a = Template::parse(NESTED).unwrap();
            let b = Template::parse(NESTED).unwrap();
            assert_ne!(a.shape_id(), b.shape_id());
        }
    }

    mod round_trip {
        use super::*;

        #[test]
        fn nested_document() {
            assert_eq!(Template::parse(NESTED).unwrap().to_string(), NESTED);
        }

        #[test]
        fn literal_document() {
            let source = "a\n\t<!-- ##L## -->  \r\n<!-- @@Q@@ --> @@z@@\n<!-- ##L## -->b";
            assert_eq!(Template::parse(source).unwrap().to_string(), source);
        }

        #[test]
        fn adjacent_tags_sharing_spaces() {
            let source = "a <!-- @@A@@ --> x <!-- @@A@@ -->  <!-- @@B@@ -->\t<!-- @@B@@ --> \n";
            assert_eq!(Template::parse(source).unwrap().to_string(), source);
        }

        #[test]
        fn plain_text() {
            let source = "no tags @@here@@ at all";
            assert_eq!(Template::parse(source).unwrap().to_string(), source);
        }

        #[test]
        fn empty_text() {
            assert_eq!(Template::parse("").unwrap().to_string(), "");
        }

        #[test]
        fn subtree_round_trips_its_own_span() {
            let template = Template::parse(NESTED).unwrap();
            let two = template.subtree("SECTION2").unwrap();
            assert_eq!(
                two.to_string(),
                "  <!-- @@SECTION2@@ -->\n  two @@b@@\n  <!-- @@SECTION2@@ -->\n"
            );
        }
    }
}
