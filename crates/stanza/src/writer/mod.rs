//! Rendering sessions over a parsed template.
//!
//! A [`Writer`] walks a [`Template`] with a selection stack. The section on
//! top of the stack (the *frame*) receives field values in its pending
//! occurrence; appending captures that occurrence and starts a new one, which
//! is how a section repeats once per data row.
//!
//! ```rust
//! use stanza::Template;
//!
//! let template = Template::parse(
//!     "<ul>\n<!-- @@ITEM@@ -->\n  <li>@@label@@</li>\n<!-- @@ITEM@@ -->\n</ul>\n",
//! ).unwrap();
//!
//! let mut writer = template.writer();
//! writer.select_section("ITEM").unwrap();
//! for label in ["one", "two"] {
//!     writer.set_field("label", label).unwrap();
//!     writer.append_section(false).unwrap();
//! }
//! writer.deselect_section().unwrap();
//!
//! assert_eq!(
//!     writer.get_content(false),
//!     "<ul>\n  <li>one</li>\n  <li>two</li>\n</ul>\n",
//! );
//! ```
//!
//! ## Providers
//!
//! A whole writer can stand in for a field. Registering it stores a private
//! copy; selecting the field through [`Writer::select_provider`] enters a
//! per-occurrence copy of that writer, and its rendered output replaces the
//! placeholder. A provider that is never selected renders nothing.
//!
//! ## Lifecycle
//!
//! Rendering consumes every captured occurrence, so each call to
//! [`Writer::render`] (or [`Writer::get_content`]) starts the next document
//! from a clean state with the stack back at the root.

mod arena;
mod bind;
mod hook;
mod occurrence;
mod render;

pub use hook::{LiteralHook, Verbatim};

use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::fields::FieldRule;
use crate::template::{InstanceId, ShapeId, Template};

use arena::{Arena, NodeId};
use occurrence::FieldSlot;

/// A mutable, single-session writer over a [`Template`].
pub struct Writer {
    arena: Arena,
    root: NodeId,
    stack: Vec<NodeId>,
    instance_id: InstanceId,
    literal_hook: Arc<dyn LiteralHook>,
    rules: HashMap<String, FieldRule>,
}

impl Writer {
    /// Creates a writer whose root is `template`.
    pub fn new(template: Template) -> Self {
        let mut arena = Arena::new();
        let root = arena.build(template);
        Self {
            arena,
            root,
            stack: vec![root],
            instance_id: InstanceId::next(),
            literal_hook: Arc::new(Verbatim),
            rules: HashMap::new(),
        }
    }

    /// Replaces the hook literal sections are written through.
    pub fn with_literal_hook<H: LiteralHook + 'static>(mut self, hook: H) -> Self {
        self.literal_hook = Arc::new(hook);
        self
    }

    /// Adds a binding rule for `field`, applied by the binding helpers.
    pub fn with_field_rule(mut self, field: impl Into<String>, rule: FieldRule) -> Self {
        self.configure_field(field, rule);
        self
    }

    /// Sets (or replaces) the binding rule for `field`.
    pub fn configure_field(&mut self, field: impl Into<String>, rule: FieldRule) {
        self.rules.insert(field.into(), rule);
    }

    /// Returns a new writer over the same template with the same provider
    /// bindings, hook and rules, but no written data.
    pub fn copy(&self) -> Writer {
        let mut arena = Arena::new();
        let root = arena.import(&self.arena, self.root);
        Writer {
            arena,
            root,
            stack: vec![root],
            instance_id: InstanceId::next(),
            literal_hook: Arc::clone(&self.literal_hook),
            rules: self.rules.clone(),
        }
    }

    fn top(&self) -> NodeId {
        // The root is never popped
        self.stack[self.stack.len() - 1]
    }

    /// The template of the root section.
    pub fn template(&self) -> &Template {
        &self.arena.get(self.root).template
    }

    pub fn shape_id(&self) -> ShapeId {
        self.template().shape_id()
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Number of entries on the selection stack (1 at the root).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Name of the section on top of the stack.
    pub fn current_section(&self) -> &str {
        self.arena.get(self.top()).template.name()
    }

    /// Section names from the root to the top of the stack.
    pub fn selection_path(&self) -> Vec<&str> {
        self.stack
            .iter()
            .map(|id| self.arena.get(*id).template.name())
            .collect()
    }

    /// Number of occurrences captured for the current section.
    pub fn occurrence_count(&self) -> usize {
        self.arena.get(self.top()).occurrences.len()
    }

    /// Whether the pending occurrence of the current section holds data.
    pub fn has_pending_data(&self) -> bool {
        self.arena.get(self.top()).pending.has_data()
    }

    /// Enters child section `name` of the current section.
    ///
    /// # Errors
    ///
    /// [`Error::SectionNotFound`] if the current section has no such child.
    pub fn select_section(&mut self, name: &str) -> Result<()> {
        let top = self.top();
        let node = self.arena.get(top);
        let prototype = *node
            .children
            .get(name)
            .ok_or_else(|| Error::SectionNotFound(name.to_string()))?;

        let id = match node.pending.sections.get(name).copied() {
            Some(id) => id,
            None => {
                let id = self.arena.instantiate(prototype);
                self.arena
                    .get_mut(top)
                    .pending
                    .sections
                    .insert(name.to_string(), id);
                id
            }
        };

        self.stack.push(id);
        Ok(())
    }

    /// Enters the provider registered for `field` in the current section.
    ///
    /// # Errors
    ///
    /// [`Error::ProviderNotFound`] if no provider is registered for `field`.
    pub fn select_provider(&mut self, field: &str) -> Result<()> {
        let top = self.top();
        let node = self.arena.get(top);
        let prototype = match node.providers.get(field) {
            Some(id) => *id,
            None => {
                return Err(Error::ProviderNotFound {
                    section: node.template.name().to_string(),
                    field: field.to_string(),
                })
            }
        };

        let existing = match node.pending.slots.get(field) {
            Some(FieldSlot::Bound(id)) => Some(*id),
            _ => None,
        };
        let id = match existing {
            Some(id) => id,
            None => {
                let id = self.arena.instantiate(prototype);
                self.store_slot(top, field, FieldSlot::Bound(id));
                id
            }
        };

        self.stack.push(id);
        Ok(())
    }

    /// Sets a field of the current section's pending occurrence.
    ///
    /// # Errors
    ///
    /// [`Error::FieldNotFound`] if the current section declares no such field.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        self.set_field_opt(name, Some(value.into()))
    }

    /// Like [`Writer::set_field`], but `None` explicitly unsets the value.
    pub fn set_field_opt(&mut self, name: &str, value: Option<String>) -> Result<()> {
        let top = self.top();
        let template = &self.arena.get(top).template;
        if !template.has_field(name) {
            return Err(Error::FieldNotFound {
                section: template.name().to_string(),
                field: name.to_string(),
            });
        }
        self.store_slot(top, name, FieldSlot::Plain(value));
        Ok(())
    }

    fn store_slot(&mut self, id: NodeId, name: &str, slot: FieldSlot) {
        let previous = self
            .arena
            .get_mut(id)
            .pending
            .slots
            .insert(name.to_string(), slot);
        if let Some(FieldSlot::Bound(old)) = previous {
            self.arena.release(old);
        }
    }

    /// Captures the pending occurrence of the current section and starts a
    /// fresh one. With `deselect`, also leaves the section.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOperation`] when deselecting at the root. Nothing is
    /// captured in that case.
    pub fn append_section(&mut self, deselect: bool) -> Result<()> {
        if deselect && self.stack.len() == 1 {
            return Err(deselect_root_error());
        }
        self.capture_pending();
        if deselect {
            self.stack.pop();
        }
        Ok(())
    }

    fn capture_pending(&mut self) {
        let node = self.arena.get_mut(self.top());
        let occurrence = mem::take(&mut node.pending);
        node.occurrences.push(occurrence);
    }

    /// Leaves the current section, discarding its pending occurrence.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOperation`] at the root.
    pub fn deselect_section(&mut self) -> Result<()> {
        if self.stack.len() == 1 {
            return Err(deselect_root_error());
        }
        self.arena.discard_pending(self.top());
        self.stack.pop();
        Ok(())
    }

    /// Appends and leaves sections until the root, or the section named
    /// `stop_at`, is on top of the stack. The stop section itself is not
    /// appended.
    ///
    /// Every pending occurrence on the way is captured, empty or not.
    pub fn append_all(&mut self, stop_at: Option<&str>) {
        while self.stack.len() > 1 {
            if stop_at == Some(self.current_section()) {
                break;
            }
            self.capture_pending();
            self.stack.pop();
        }
    }

    /// Drops every captured occurrence of the current section, along with its
    /// pending one.
    pub fn reset(&mut self) {
        self.arena.reset(self.top());
    }

    /// Discards the pending occurrence of the current section, keeping the
    /// occurrences already appended.
    pub fn clear(&mut self) {
        self.arena.discard_pending(self.top());
    }

    /// Binds `provider` to `field` of the current section.
    ///
    /// Returns `false`, changing nothing, when the section has no such field,
    /// the field already has a provider, or `provider` is this writer.
    /// Otherwise stores a private copy of `provider` and returns `true`.
    pub fn register_field_provider(&mut self, field: &str, provider: &Writer) -> bool {
        let top = self.top();
        self.register_on(top, field, provider)
    }

    /// Binds `provider` to `field` of section `section`, looked up at or
    /// below the current section.
    ///
    /// Occurrences of `section` created from then on carry the provider.
    /// Returns `false` when the section is not found, or for any reason
    /// [`Writer::register_field_provider`] would.
    pub fn register_section_provider(
        &mut self,
        section: &str,
        field: &str,
        provider: &Writer,
    ) -> bool {
        match self.arena.find_prototype(self.top(), section) {
            Some(target) => self.register_on(target, field, provider),
            None => {
                tracing::debug!(section, field, "provider rejected: unknown section");
                false
            }
        }
    }

    fn register_on(&mut self, target: NodeId, field: &str, provider: &Writer) -> bool {
        if provider.instance_id == self.instance_id {
            tracing::debug!(field, "provider rejected: writer cannot provide for itself");
            return false;
        }

        let node = self.arena.get(target);
        if !node.template.has_field(field) {
            tracing::debug!(
                section = node.template.name(),
                field,
                "provider rejected: unknown field"
            );
            return false;
        }
        if node.providers.contains_key(field) {
            tracing::debug!(
                section = node.template.name(),
                field,
                "provider rejected: field already bound"
            );
            return false;
        }

        let copy = self.arena.import(&provider.arena, provider.root);
        self.arena
            .get_mut(target)
            .providers
            .insert(field.to_string(), copy);
        true
    }

    /// Whether `field` of the current section has a registered provider.
    pub fn has_provider(&self, field: &str) -> bool {
        self.arena.get(self.top()).providers.contains_key(field)
    }

    /// Renders the document, first appending every open section when
    /// `append_all_first` is set.
    pub fn get_content(&mut self, append_all_first: bool) -> String {
        if append_all_first {
            self.append_all(None);
        }
        self.render()
    }
}

fn deselect_root_error() -> Error {
    Error::InvalidOperation("cannot deselect the parent section".to_string())
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer")
            .field("template", self.template())
            .field("instance_id", &self.instance_id)
            .field("selection", &self.selection_path())
            .field("rules", &self.rules)
            .finish()
    }
}
