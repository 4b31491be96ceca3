//! Process-wide component catalog
//!
//! Maps class identifiers to the providers that implement them. The catalog
//! is populated while manifests load and read at activation time; entries are
//! never removed, so insertion is serialized and lookups see a consistent
//! view for the life of the process.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::ActivationError;
use crate::provider::Provider;
use crate::Result;

/// Append-only map from class identifier to a shared provider record.
///
/// Class identifiers match case-insensitively and exactly (no prefix or
/// namespace matching). Several identifiers may share one provider when a
/// module declares multiple classes.
#[derive(Debug, Default)]
pub struct ComponentCatalog {
    entries: RwLock<HashMap<String, Arc<Provider>>>,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register a provider under `class_id`.
    ///
    /// First registration wins: a second insert for an identifier already
    /// present fails with [`ActivationError::DuplicateClass`] and leaves the
    /// existing entry untouched.
    pub fn insert(&self, class_id: &str, provider: Arc<Provider>) -> Result<()> {
        let key = canonical_key(class_id);
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.contains_key(&key) {
            return Err(ActivationError::duplicate(class_id));
        }
        tracing::debug!(class_id, module = provider.module_path(), "class registered");
        entries.insert(key, provider);
        Ok(())
    }

    /// Look up the provider registered for `class_id`, if any.
    pub fn lookup(&self, class_id: &str) -> Option<Arc<Provider>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(&canonical_key(class_id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Canonical (lowercased) identifiers of every registered class, sorted.
    /// Diagnostic surface for the CLI; not part of the resolution path.
    pub fn class_ids(&self) -> Vec<String> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut ids: Vec<String> = entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn canonical_key(class_id: &str) -> String {
    class_id.to_lowercase()
}
