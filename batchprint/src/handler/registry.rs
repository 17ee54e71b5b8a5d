//! Handler registry.
//!
//! Maps file types and extensions to the [`Handler`] responsible for them.
//! The registry is the single answer to "can this file be processed".
//!
//! Ownership is exclusive: a later registration for an already claimed type
//! or extension replaces the earlier handler for that key. Replacements are
//! logged and returned to the caller as [`Superseded`] records.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::Handler;
use crate::document::{FileType, extension_of, normalize_extension};

/// A key a handler can claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegistryKey {
    /// A file type.
    Type(FileType),
    /// A normalized extension.
    Extension(String),
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(ft) => write!(f, "type {ft}"),
            Self::Extension(ext) => write!(f, "extension {ext}"),
        }
    }
}

/// Record of a key that changed owner during registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superseded {
    /// The contested key.
    pub key: RegistryKey,
    /// Handler that owned the key before.
    pub previous: &'static str,
    /// Handler that owns it now.
    pub replacement: &'static str,
}

/// Dispatch table from file type and extension to handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    by_type: HashMap<FileType, Arc<dyn Handler>>,
    by_extension: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from handlers, registered in order.
    pub fn with_handlers<I>(handlers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Handler>>,
    {
        let mut registry = Self::new();
        for handler in handlers {
            registry.register(handler);
        }
        registry
    }

    /// Register a handler under every type and extension it declares.
    ///
    /// Already claimed keys are taken over by `handler`; each takeover is
    /// logged at warn level and reported in the returned list.
    pub fn register(&mut self, handler: Arc<dyn Handler>) -> Vec<Superseded> {
        let mut superseded = Vec::new();
        let name = handler.name();

        for file_type in handler.supported_file_types() {
            if let Some(previous) = self.by_type.insert(*file_type, Arc::clone(&handler)) {
                superseded.push(Superseded {
                    key: RegistryKey::Type(*file_type),
                    previous: previous.name(),
                    replacement: name,
                });
            }
        }

        for ext in handler.supported_extensions() {
            let ext = normalize_extension(ext);
            if let Some(previous) = self.by_extension.insert(ext.clone(), Arc::clone(&handler)) {
                superseded.push(Superseded {
                    key: RegistryKey::Extension(ext),
                    previous: previous.name(),
                    replacement: name,
                });
            }
        }

        for entry in &superseded {
            warn!(
                key = %entry.key,
                previous = entry.previous,
                replacement = entry.replacement,
                "handler registration supersedes existing owner"
            );
        }
        debug!(handler = name, "registered handler");

        superseded
    }

    /// Remove every key owned by the handler named `name`.
    ///
    /// Returns true when anything was removed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.by_type.len() + self.by_extension.len();
        self.by_type.retain(|_, h| h.name() != name);
        self.by_extension.retain(|_, h| h.name() != name);
        let removed = before != self.by_type.len() + self.by_extension.len();
        if removed {
            debug!(handler = name, "unregistered handler");
        }
        removed
    }

    /// Handler owning a file type.
    pub fn resolve_by_type(&self, file_type: FileType) -> Option<Arc<dyn Handler>> {
        self.by_type.get(&file_type).cloned()
    }

    /// Handler owning an extension. Case and leading dot are ignored.
    pub fn resolve_by_extension(&self, extension: &str) -> Option<Arc<dyn Handler>> {
        self.by_extension
            .get(&normalize_extension(extension))
            .cloned()
    }

    /// Handler for a path, resolved by its extension.
    pub fn resolve_by_path(&self, path: &Path) -> Option<Arc<dyn Handler>> {
        extension_of(path).and_then(|ext| self.resolve_by_extension(&ext))
    }

    /// Whether a registered handler claims the file and accepts it.
    pub fn can_handle(&self, path: &Path) -> bool {
        self.resolve_by_path(path)
            .map(|handler| handler.can_handle(path))
            .unwrap_or(false)
    }

    /// All claimed extensions, sorted.
    pub fn supported_extensions(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self.by_extension.keys().collect();
        set.into_iter().cloned().collect()
    }

    /// Claimed extensions grouped by owning handler name, sorted.
    pub fn extensions_by_handler(&self) -> Vec<(&'static str, Vec<String>)> {
        let mut grouped: HashMap<&'static str, BTreeSet<String>> = HashMap::new();
        for (ext, handler) in &self.by_extension {
            grouped
                .entry(handler.name())
                .or_default()
                .insert(ext.clone());
        }
        let mut rows: Vec<_> = grouped
            .into_iter()
            .map(|(name, exts)| (name, exts.into_iter().collect()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        rows
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty() && self.by_extension.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: BTreeSet<String> = self
            .by_type
            .iter()
            .map(|(ft, h)| format!("{ft}={}", h.name()))
            .collect();
        f.debug_struct("HandlerRegistry")
            .field("types", &types)
            .field("extensions", &self.by_extension.len())
            .finish()
    }
}
