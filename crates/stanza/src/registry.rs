//! Loading and caching parsed templates.
//!
//! Parsing is the expensive part of working with a template; writing is
//! cheap. [`TemplateRegistry`] parses a key on first use and hands out
//! shared [`Template`] copies (and fresh [`Writer`]s) from then on.
//!
//! Where the source text comes from is up to a [`TextLoader`]: a map of
//! inline sources, a closure reading files, anything that maps a key to text.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use stanza::TemplateRegistry;
//!
//! let mut sources = HashMap::new();
//! sources.insert(
//!     "greeting".to_string(),
//!     "Hello, @@name@@!".to_string(),
//! );
//!
//! let registry = TemplateRegistry::new();
//! let mut writer = registry.writer("greeting", &sources).unwrap();
//! writer.set_field("name", "world").unwrap();
//! assert_eq!(writer.get_content(false), "Hello, world!");
//! assert!(registry.contains("greeting"));
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::template::Template;
use crate::writer::Writer;

/// Resolves a key to template source text.
pub trait TextLoader {
    /// # Errors
    ///
    /// Implementations return [`Error::NotFound`] for unknown keys.
    fn load_text(&self, key: &str) -> Result<String>;
}

impl TextLoader for HashMap<String, String> {
    fn load_text(&self, key: &str) -> Result<String> {
        self.get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }
}

impl<F> TextLoader for F
where
    F: Fn(&str) -> Result<String>,
{
    fn load_text(&self, key: &str) -> Result<String> {
        self(key)
    }
}

/// A keyed store of parsed templates.
pub trait TemplateCache {
    /// Returns the template cached under `key`, calling `factory` to create
    /// it when absent. A failed factory caches nothing.
    fn get_or_add<F>(&self, key: &str, factory: F) -> Result<Template>
    where
        F: FnOnce() -> Result<Template>;
}

/// In-memory template cache.
///
/// The lock is released while a template is being parsed, so a loader may
/// itself load other templates from the same registry. Two threads missing
/// the same key may both parse it; the first one stored wins and both get
/// that template. Entries live until removed; there is no expiry.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: Mutex<HashMap<String, Template>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Template>> {
        self.templates.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the template for `key`, loading and parsing it through
    /// `loader` on first use.
    ///
    /// # Errors
    ///
    /// Loader errors and parse errors are returned as-is; nothing is cached
    /// for the key in that case.
    pub fn load<L: TextLoader + ?Sized>(&self, key: &str, loader: &L) -> Result<Template> {
        self.get_or_add(key, || {
            let source = loader.load_text(key)?;
            Template::parse(&source)
        })
    }

    /// Returns a new writer over the template for `key`.
    pub fn writer<L: TextLoader + ?Sized>(&self, key: &str, loader: &L) -> Result<Writer> {
        Ok(self.load(key, loader)?.writer())
    }

    /// Parses `source` and stores it under `key`, replacing any previous
    /// entry.
    pub fn insert(&self, key: impl Into<String>, source: &str) -> Result<()> {
        let template = Template::parse(source)?;
        self.lock().insert(key.into(), template);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Template> {
        self.lock().get(key).map(Template::copy)
    }

    pub fn remove(&self, key: &str) -> Option<Template> {
        self.lock().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Cached keys, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl TemplateCache for TemplateRegistry {
    fn get_or_add<F>(&self, key: &str, factory: F) -> Result<Template>
    where
        F: FnOnce() -> Result<Template>,
    {
        if let Some(template) = self.lock().get(key) {
            return Ok(template.copy());
        }

        let template = factory()?;
        let sections = template.child_names().count();
        let cached = self.lock().entry(key.to_string()).or_insert(template).copy();
        tracing::debug!(key, sections, "cached template");
        Ok(cached)
    }
}
