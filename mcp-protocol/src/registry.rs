// mcp-protocol/src/registry.rs
// ============================================================================
// Module: Handler Registry
// Description: Generic read-mostly registry backing the tool/resource/
//              prompt/completion handler maps.
// Purpose: One concurrent add/remove/list/get implementation shared by all
//          four registry families instead of four bespoke maps.
// Dependencies: (std only)
// ============================================================================

//! ## Overview
//! Registries are read-mostly: many `tools/list`/`tools/call` lookups against
//! occasional `add`/`remove` mutation. The map is keyed by whatever identity
//! a family uses (tool/prompt name, resource URI, or a `(refType, refId)`
//! tuple for completions) and guarded by a single [`std::sync::RwLock`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use mcp_schema::McpError;

/// A concurrent `add`/`remove`/`get`/`list` map keyed by `K`, storing `V`.
pub struct Registry<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::AlreadyExists`] if `key` is already registered.
    pub fn add(&self, key: K, value: V) -> Result<(), McpError>
    where
        K: std::fmt::Display,
    {
        let mut entries = self.write_lock();
        if entries.contains_key(&key) {
            return Err(McpError::AlreadyExists(key.to_string()));
        }
        entries.insert(key, value);
        Ok(())
    }

    /// Removes a registered entry.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::NotFound`] if `key` is not registered.
    pub fn remove(&self, key: &K) -> Result<V, McpError>
    where
        K: std::fmt::Display,
    {
        self.write_lock().remove(key).ok_or_else(|| McpError::NotFound(key.to_string()))
    }

    /// Looks up one entry by key.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.read_lock().get(key).cloned()
    }

    /// Returns `true` if `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.read_lock().contains_key(key)
    }

    /// Snapshots every registered value. Ordering is unspecified; callers
    /// that need a stable page order sort before slicing.
    #[must_use]
    pub fn list_all(&self) -> Vec<V> {
        self.read_lock().values().cloned().collect()
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_lock().len()
    }

    /// Whether the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, HashMap<K, V>> {
        self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<K, V>> {
        self.entries.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<K, V> Default for Registry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
