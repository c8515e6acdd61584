use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::types::{bytes_stream, collect_stream};
use crate::{ByteStream, Content, Storage, StorageError, StoreResult, UrlOptions};

/// In-memory backend for testing and development
///
/// Objects live in a single map; clones share the same underlying store.
#[derive(Clone)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Drop every stored object
    pub fn clear(&self) {
        self.objects.write().clear();
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(&self, content: Content, id: &str) -> StoreResult<()> {
        let bytes = match content {
            Content::Bytes(bytes) => bytes,
            Content::Stream(stream) => collect_stream(stream).await?,
            Content::Move { id: from_id } => {
                let mut objects = self.objects.write();
                let bytes = objects
                    .remove(&from_id)
                    .ok_or_else(|| StorageError::not_found(&from_id))?;
                objects.insert(id.to_string(), bytes);
                return Ok(());
            }
        };

        self.objects.write().insert(id.to_string(), bytes);
        Ok(())
    }

    async fn open(&self, id: &str) -> StoreResult<ByteStream> {
        let bytes = self
            .objects
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(id))?;
        Ok(bytes_stream(bytes))
    }

    async fn exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.objects.read().contains_key(id))
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.objects.write().remove(id);
        Ok(())
    }

    async fn delete_prefixed(&self, prefix: &str) -> StoreResult<()> {
        self.objects
            .write()
            .retain(|id, _| !id.starts_with(prefix));
        Ok(())
    }

    async fn url(&self, id: &str, _options: &UrlOptions) -> StoreResult<String> {
        Ok(format!("memory://{}", id))
    }
}
