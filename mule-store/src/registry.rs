use std::collections::HashMap;
use std::sync::Arc;

use crate::{Storage, StorageError, StoreResult};

/// Conventional key for the backend holding freshly attached, not-yet-durable
/// files
pub const CACHE: &str = "cache";

/// Conventional key for the backend holding durably persisted files
pub const STORE: &str = "store";

/// Maps storage keys (e.g. "cache", "store") to backend instances.
///
/// Built once at configuration time and passed by reference into uploaders
/// and attachers; never mutated afterwards.
pub struct StorageRegistry {
    storages: HashMap<String, Arc<dyn Storage>>,
}

impl StorageRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            storages: HashMap::new(),
        }
    }

    /// Register a backend under a given key.
    pub fn register<K, S>(mut self, key: K, storage: S) -> Self
    where
        K: Into<String>,
        S: Storage + 'static,
    {
        self.storages.insert(key.into(), Arc::new(storage));
        self
    }

    /// Look up a backend by key.
    pub fn get(&self, key: &str) -> StoreResult<Arc<dyn Storage>> {
        self.storages.get(key).cloned().ok_or_else(|| {
            StorageError::configuration(format!("No storage registered under key '{}'", key))
        })
    }

    /// Check whether a key is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.storages.contains_key(key)
    }

    /// Registered keys, in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.storages.keys().map(String::as_str)
    }
}

impl Default for StorageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    #[test]
    fn test_get_unknown_key_is_configuration_error() {
        let registry = StorageRegistry::new();
        let err = registry.get("store").err().unwrap();
        assert!(matches!(err, StorageError::Configuration { .. }));
    }

    #[test]
    fn test_register_and_get() {
        let registry = StorageRegistry::new()
            .register(CACHE, MemoryStorage::new())
            .register(STORE, MemoryStorage::new());

        assert!(registry.contains(CACHE));
        assert!(registry.get(STORE).is_ok());
        assert!(!registry.contains("backup"));
    }
}
