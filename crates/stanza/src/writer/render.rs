use crate::template::Fragment;

use super::arena::NodeId;
use super::occurrence::{FieldSlot, Occurrence};
use super::Writer;

impl Writer {
    /// Renders the document without appending open sections.
    ///
    /// The root emits its captured occurrences, followed by its pending one
    /// when nothing was captured or when it holds data, so a document always
    /// renders at least once. Nested sections and providers emit captured
    /// occurrences only.
    ///
    /// Rendering consumes all written data: afterwards the writer is back at
    /// the root with no occurrences, ready for the next document.
    pub fn render(&mut self) -> String {
        let mut out = String::new();
        let root = self.arena.get(self.root);
        for occurrence in &root.occurrences {
            self.render_occurrence(self.root, occurrence, &mut out);
        }
        let captured = root.occurrences.len();
        if captured == 0 || root.pending.has_data() {
            self.render_occurrence(self.root, &root.pending, &mut out);
        }

        tracing::trace!(
            template = %self.template().name(),
            occurrences = captured,
            bytes = out.len(),
            "rendered document"
        );

        self.stack.truncate(1);
        self.arena.reset(self.root);
        out
    }

    fn render_node(&self, id: NodeId, out: &mut String) {
        for occurrence in &self.arena.get(id).occurrences {
            self.render_occurrence(id, occurrence, out);
        }
    }

    fn render_occurrence(&self, id: NodeId, occurrence: &Occurrence, out: &mut String) {
        let template = &self.arena.get(id).template;
        let own = template.name();
        let keep_whitespace = template.is_single_line() && occurrence.has_data();

        for fragment in template.fragments() {
            match fragment {
                Fragment::Text(text) => out.push_str(text),
                Fragment::Field(name) => match occurrence.slots.get(name) {
                    Some(FieldSlot::Plain(Some(value))) => out.push_str(value),
                    Some(FieldSlot::Bound(provider)) => self.render_node(*provider, out),
                    Some(FieldSlot::Plain(None)) | None => {}
                },
                Fragment::SectionPlaceholder(name) => {
                    if let Some(child) = occurrence.sections.get(name) {
                        self.render_node(*child, out);
                    }
                }
                Fragment::Literal { name, raw } => {
                    self.literal_hook.write_literal(name, raw, out);
                }
                Fragment::Prefix { name, whitespace } | Fragment::Suffix { name, whitespace } => {
                    if (keep_whitespace && name == own) || template.is_inline_literal(name) {
                        out.push_str(whitespace);
                    }
                }
                Fragment::SectionTag { .. } => {}
            }
        }
    }
}
