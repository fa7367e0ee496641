//! Shared side-effect store
//!
//! One store is owned by the root traversal and shared by reference with
//! every nested traversal. Cloning a [`SideEffects`] handle shares the store;
//! [`SideEffects::deep_clone`] copies it.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
struct Store {
    values: IndexMap<String, Value>,
    sack: Option<Value>,
}

/// Handle to a key/value store plus an optional sack initial value
#[derive(Debug, Clone, Default)]
pub struct SideEffects {
    inner: Arc<RwLock<Store>>,
}

impl SideEffects {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` with the value from `initial` unless already present
    ///
    /// Returns `true` when the key was newly registered.
    pub fn register_if_absent(&self, key: &str, initial: impl FnOnce() -> Value) -> bool {
        let mut store = self.inner.write();
        if store.values.contains_key(key) {
            return false;
        }
        store.values.insert(key.to_string(), initial());
        true
    }

    /// Set a value, returning the previous one
    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.inner.write().values.insert(key.into(), value)
    }

    /// Copy of the value under `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().values.get(key).cloned()
    }

    /// Mutate the value under `key`
    ///
    /// `f` works on a copy with no lock held, so it may read the store; the
    /// copy is written back unless `f` removed the key. Returns `false` when
    /// the key is not registered.
    pub fn update<F>(&self, key: &str, f: F) -> bool
    where
        F: FnOnce(&mut Value),
    {
        let Some(mut value) = self.get(key) else {
            return false;
        };
        f(&mut value);
        if let Some(slot) = self.inner.write().values.get_mut(key) {
            *slot = value;
        }
        true
    }

    /// Remove a key, keeping the order of the remaining ones
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().values.shift_remove(key)
    }

    /// Registered keys in registration order
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().values.keys().cloned().collect()
    }

    /// Check whether `key` is registered
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().values.contains_key(key)
    }

    /// Number of registered keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().values.len()
    }

    /// Check for an empty key set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().values.is_empty()
    }

    /// Set the value every new traverser's sack starts with
    pub fn set_sack_initial_value(&self, value: Value) {
        self.inner.write().sack = Some(value);
    }

    /// Sack initial value, if any
    #[must_use]
    pub fn sack_initial_value(&self) -> Option<Value> {
        self.inner.read().sack.clone()
    }

    /// Snapshot of all values in registration order
    #[must_use]
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.inner.read().values.clone()
    }

    /// Independent copy of the store
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self {
            inner: Arc::new(RwLock::new(self.inner.read().clone())),
        }
    }

    /// Check whether both handles point at the same store
    #[inline]
    #[must_use]
    pub fn shares_store_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
