//! Slot storage for writer nodes.
//!
//! Every writer node (section prototypes, per-occurrence section copies and
//! provider copies) lives in one [`Arena`] owned by its [`Writer`](super::Writer)
//! and is addressed by [`NodeId`]. Ownership is strictly tree-shaped: a node
//! owns its child prototypes, its provider copies and every node referenced by
//! its occurrences, so [`Arena::release`] can free a whole subtree.

use std::collections::HashMap;
use std::mem;

use crate::template::Template;

use super::occurrence::Occurrence;

/// Index of a node in the writer arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

/// One section's writing state.
#[derive(Debug)]
pub(crate) struct WriterNode {
    pub template: Template,
    /// Prototype writer per child section, copied into each occurrence on
    /// first selection.
    pub children: HashMap<String, NodeId>,
    /// Provider prototype per field, copied into each occurrence on first
    /// selection.
    pub providers: HashMap<String, NodeId>,
    pub occurrences: Vec<Occurrence>,
    pub pending: Occurrence,
}

impl WriterNode {
    fn new(template: Template) -> Self {
        Self {
            template,
            children: HashMap::new(),
            providers: HashMap::new(),
            occurrences: Vec::new(),
            pending: Occurrence::default(),
        }
    }
}

/// Arena of writer nodes with slot reuse.
///
/// # Invariants
///
/// - Slots in the free list contain `None`.
/// - Every live `NodeId` handed out by a writer points at a `Some` slot.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Option<WriterNode>>,
    free_list: Vec<u32>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, node: WriterNode) -> NodeId {
        if let Some(idx) = self.free_list.pop() {
            debug_assert!(self.slots[idx as usize].is_none(), "free slot was not empty");
            self.slots[idx as usize] = Some(node);
            NodeId(idx)
        } else {
            let idx = self.slots.len();
            assert!(idx < u32::MAX as usize, "arena exceeded maximum capacity");
            self.slots.push(Some(node));
            NodeId(idx as u32)
        }
    }

    /// # Panics
    ///
    /// Panics if the slot has been released.
    pub fn get(&self, id: NodeId) -> &WriterNode {
        self.slots[id.0 as usize]
            .as_ref()
            .expect("writer node slot is empty")
    }

    /// # Panics
    ///
    /// Panics if the slot has been released.
    pub fn get_mut(&mut self, id: NodeId) -> &mut WriterNode {
        self.slots[id.0 as usize]
            .as_mut()
            .expect("writer node slot is empty")
    }

    /// Builds prototype nodes mirroring `template` and its descendants.
    pub fn build(&mut self, template: Template) -> NodeId {
        let names: Vec<String> = template.child_names().map(str::to_string).collect();
        let mut node = WriterNode::new(template);
        for name in names {
            if let Some(child) = node.template.child(&name) {
                let id = self.build(child);
                node.children.insert(name, id);
            }
        }
        self.alloc(node)
    }

    /// Copies the node `id` with fresh occurrence state.
    ///
    /// Child prototypes and registered providers are copied recursively, so
    /// the copy never shares a node with its source.
    pub fn instantiate(&mut self, id: NodeId) -> NodeId {
        let source = self.get(id);
        let template = source.template.copy();
        let children: Vec<(String, NodeId)> =
            source.children.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let providers: Vec<(String, NodeId)> =
            source.providers.iter().map(|(k, v)| (k.clone(), *v)).collect();

        let mut node = WriterNode::new(template);
        for (name, child) in children {
            let copy = self.instantiate(child);
            node.children.insert(name, copy);
        }
        for (field, provider) in providers {
            let copy = self.instantiate(provider);
            node.providers.insert(field, copy);
        }
        self.alloc(node)
    }

    /// Copies node `id` of another arena into this one, with fresh
    /// occurrence state.
    pub fn import(&mut self, other: &Arena, id: NodeId) -> NodeId {
        let source = other.get(id);
        let mut node = WriterNode::new(source.template.copy());
        for (name, child) in &source.children {
            let copy = self.import(other, *child);
            node.children.insert(name.clone(), copy);
        }
        for (field, provider) in &source.providers {
            let copy = self.import(other, *provider);
            node.providers.insert(field.clone(), copy);
        }
        self.alloc(node)
    }

    /// Frees node `id` and every node it owns.
    pub fn release(&mut self, id: NodeId) {
        let node = self.slots[id.0 as usize]
            .take()
            .expect("double release of writer node");
        self.free_list.push(id.0);

        for child in node.children.into_values() {
            self.release(child);
        }
        for provider in node.providers.into_values() {
            self.release(provider);
        }
        for occurrence in node.occurrences {
            self.release_occurrence(occurrence);
        }
        self.release_occurrence(node.pending);
    }

    /// Frees every node referenced by an occurrence.
    pub fn release_occurrence(&mut self, occurrence: Occurrence) {
        for id in occurrence.into_nodes() {
            self.release(id);
        }
    }

    /// Replaces the pending occurrence of `id` with a fresh one.
    pub fn discard_pending(&mut self, id: NodeId) {
        let pending = mem::take(&mut self.get_mut(id).pending);
        self.release_occurrence(pending);
    }

    /// Drops every captured occurrence of `id` and its pending one.
    pub fn reset(&mut self, id: NodeId) {
        let occurrences = mem::take(&mut self.get_mut(id).occurrences);
        for occurrence in occurrences {
            self.release_occurrence(occurrence);
        }
        self.discard_pending(id);
    }

    /// Finds the node for section `name` at or below `id`, following
    /// prototypes only.
    pub fn find_prototype(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let node = self.get(id);
        if node.template.name() == name {
            return Some(id);
        }
        node.children
            .values()
            .find_map(|child| self.find_prototype(*child, name))
    }

    /// Number of live nodes.
    #[cfg(test)]
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
