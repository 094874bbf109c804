//! Per-occurrence value sets.

use std::collections::HashMap;

use super::arena::NodeId;

/// What a field placeholder renders for one occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldSlot {
    /// A scalar value; `None` renders as an empty string.
    Plain(Option<String>),
    /// A provider copy whose full output replaces the placeholder.
    Bound(NodeId),
}

/// One instance's worth of data for a section.
///
/// Each [`append_section`](super::Writer::append_section) captures the
/// pending occurrence and starts a fresh one; this is how a section repeats
/// once per data row.
#[derive(Debug, Default)]
pub(crate) struct Occurrence {
    pub slots: HashMap<String, FieldSlot>,
    /// Copies of child section writers, created on first selection.
    pub sections: HashMap<String, NodeId>,
}

impl Occurrence {
    /// True once any value is set or any nested writer exists.
    pub fn has_data(&self) -> bool {
        !self.sections.is_empty()
            || self.slots.values().any(|slot| match slot {
                FieldSlot::Plain(value) => value.is_some(),
                FieldSlot::Bound(_) => true,
            })
    }

    /// Every arena node owned by this occurrence.
    pub fn into_nodes(self) -> impl Iterator<Item = NodeId> {
        let bound = self.slots.into_values().filter_map(|slot| match slot {
            FieldSlot::Bound(id) => Some(id),
            FieldSlot::Plain(_) => None,
        });
        bound.chain(self.sections.into_values())
    }
}
