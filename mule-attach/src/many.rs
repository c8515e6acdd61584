use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use mule_store::{ByteStream, StorageRegistry, CACHE, STORE};

use crate::{AttachResult, UploadOptions, UploadedFile, Uploader};

/// Lifecycle state machine for an ordered collection of attachments on one
/// record instance.
///
/// The single-attachment state machine replicated over a sequence:
/// `promote`, `persist` and `destroy_attached` apply element-wise, while
/// `add`/`remove`/`clear` mutate the sequence directly and mark the whole
/// field dirty. `remove` and `clear` delete backing objects immediately.
pub struct ManyAttacher {
    uploader: Uploader,
    cache_key: String,
    store_key: String,
    items: Vec<UploadedFile>,
    dirty: bool,
}

impl ManyAttacher {
    /// Create an empty collection using the conventional "cache"/"store" keys
    pub fn new(registry: Arc<StorageRegistry>) -> Self {
        Self {
            uploader: Uploader::new(registry),
            cache_key: CACHE.to_string(),
            store_key: STORE.to_string(),
            items: Vec::new(),
            dirty: false,
        }
    }

    /// Create a collection holding previously persisted references
    pub fn from_loaded(registry: Arc<StorageRegistry>, loaded: Vec<UploadedFile>) -> Self {
        let mut attacher = Self::new(registry);
        attacher.items = loaded;
        attacher
    }

    /// Replace the uploader (custom extractor or location strategy)
    pub fn with_uploader(mut self, uploader: Uploader) -> Self {
        self.uploader = uploader;
        self
    }

    /// Use non-conventional cache/store keys
    pub fn with_keys<C, S>(mut self, cache_key: C, store_key: S) -> Self
    where
        C: Into<String>,
        S: Into<String>,
    {
        self.cache_key = cache_key.into();
        self.store_key = store_key.into();
        self
    }

    /// Attached files, in insertion order
    pub fn files(&self) -> &[UploadedFile] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when the collection has changed since the last successful persist
    pub fn changed(&self) -> bool {
        self.dirty
    }

    /// Upload a stream to cache storage and append it to the collection
    pub async fn add(&mut self, content: ByteStream, options: &UploadOptions) -> AttachResult<()> {
        let uploaded = self
            .uploader
            .upload(content, &self.cache_key, options)
            .await?;
        debug!(id = %uploaded.id, "Added file to collection");
        self.items.push(uploaded);
        self.dirty = true;
        Ok(())
    }

    /// Add already-buffered bytes; see [`ManyAttacher::add`]
    pub async fn add_bytes(
        &mut self,
        content: impl Into<Bytes>,
        options: &UploadOptions,
    ) -> AttachResult<()> {
        let uploaded = self
            .uploader
            .upload_bytes(content, &self.cache_key, options)
            .await?;
        debug!(id = %uploaded.id, "Added file to collection");
        self.items.push(uploaded);
        self.dirty = true;
        Ok(())
    }

    /// Remove the attachment with the given id, deleting its backing object.
    ///
    /// Returns the removed reference, or `None` when no attachment matches.
    pub async fn remove(&mut self, id: &str) -> AttachResult<Option<UploadedFile>> {
        let Some(index) = self.items.iter().position(|file| file.id == id) else {
            return Ok(None);
        };

        self.items[index]
            .delete(self.uploader.registry())
            .await?;
        let removed = self.items.remove(index);
        debug!(id = %removed.id, "Removed file from collection");
        self.dirty = true;
        Ok(Some(removed))
    }

    /// Empty the collection, deleting every backing object
    pub async fn clear(&mut self) -> AttachResult<()> {
        for file in &self.items {
            file.delete(self.uploader.registry()).await?;
        }
        debug!(count = self.items.len(), "Cleared collection");
        self.items.clear();
        self.dirty = true;
        Ok(())
    }

    /// Move every cached item to store storage; already-stored items are
    /// untouched.
    ///
    /// Intended for the record layer's before-save hook.
    pub async fn promote(&mut self) -> AttachResult<()> {
        for index in 0..self.items.len() {
            if self.items[index].storage_key != self.cache_key {
                continue;
            }
            let promoted = self
                .uploader
                .move_to(&self.items[index], &self.store_key)
                .await?;
            debug!(from = %self.items[index].id, to = %promoted.id, "Promoted file");
            self.items[index] = promoted;
        }
        Ok(())
    }

    /// Clear the dirty flag once the owning record has durably persisted the
    /// collection.
    ///
    /// Intended for the record layer's after-save hook. Removal deletions
    /// happen eagerly, so there is nothing deferred to clean up here.
    pub async fn persist(&mut self) -> AttachResult<()> {
        self.dirty = false;
        Ok(())
    }

    /// Delete every item's backing object.
    ///
    /// Intended for the record layer's after-destroy hook. The in-memory
    /// sequence is left in place.
    pub async fn destroy_attached(&mut self) -> AttachResult<()> {
        for file in &self.items {
            file.delete(self.uploader.registry()).await?;
            debug!(id = %file.id, "Destroyed attached file");
        }
        Ok(())
    }

    /// Persistable representation: a JSON array of references, `[]` when
    /// empty
    pub fn data(&self) -> AttachResult<serde_json::Value> {
        Ok(serde_json::to_value(&self.items)?)
    }

    /// Rebuild a collection from a persisted representation
    pub fn load(registry: Arc<StorageRegistry>, data: serde_json::Value) -> AttachResult<Self> {
        let loaded: Vec<UploadedFile> = serde_json::from_value(data)?;
        Ok(Self::from_loaded(registry, loaded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mule_store::MemoryStorage;

    fn test_registry() -> Arc<StorageRegistry> {
        Arc::new(
            StorageRegistry::new()
                .register(CACHE, MemoryStorage::new())
                .register(STORE, MemoryStorage::new()),
        )
    }

    #[tokio::test]
    async fn test_add_grows_and_marks_dirty() {
        let mut attacher = ManyAttacher::new(test_registry());
        assert!(attacher.is_empty());

        attacher
            .add_bytes(&b"one"[..], &UploadOptions::new())
            .await
            .unwrap();

        assert_eq!(attacher.len(), 1);
        assert!(attacher.changed());
    }

    #[tokio::test]
    async fn test_remove_deletes_backing_object() {
        let registry = test_registry();
        let mut attacher = ManyAttacher::new(registry.clone());
        attacher
            .add_bytes(&b"one"[..], &UploadOptions::new())
            .await
            .unwrap();
        attacher
            .add_bytes(&b"two"[..], &UploadOptions::new())
            .await
            .unwrap();

        let target = attacher.files()[0].clone();
        let removed = attacher.remove(&target.id).await.unwrap().unwrap();

        assert_eq!(removed, target);
        assert_eq!(attacher.len(), 1);
        assert!(!target.exists(&registry).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_unknown_id_is_none() {
        let mut attacher = ManyAttacher::new(test_registry());
        assert!(attacher.remove("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_deletes_everything() {
        let registry = test_registry();
        let mut attacher = ManyAttacher::new(registry.clone());
        attacher
            .add_bytes(&b"one"[..], &UploadOptions::new())
            .await
            .unwrap();
        attacher
            .add_bytes(&b"two"[..], &UploadOptions::new())
            .await
            .unwrap();
        let files: Vec<UploadedFile> = attacher.files().to_vec();

        attacher.clear().await.unwrap();

        assert!(attacher.is_empty());
        for file in files {
            assert!(!file.exists(&registry).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_promote_is_element_wise() {
        let mut attacher = ManyAttacher::new(test_registry());
        attacher
            .add_bytes(&b"one"[..], &UploadOptions::new())
            .await
            .unwrap();
        attacher
            .add_bytes(&b"two"[..], &UploadOptions::new())
            .await
            .unwrap();

        attacher.promote().await.unwrap();

        for file in attacher.files() {
            assert_eq!(file.storage_key, STORE);
        }
    }

    #[tokio::test]
    async fn test_data_roundtrip() {
        let registry = test_registry();
        let mut attacher = ManyAttacher::new(registry.clone());
        attacher
            .add_bytes(&b"one"[..], &UploadOptions::new())
            .await
            .unwrap();

        let data = attacher.data().unwrap();
        let reloaded = ManyAttacher::load(registry, data).unwrap();

        assert_eq!(reloaded.files(), attacher.files());
        assert!(!reloaded.changed());
    }

    #[tokio::test]
    async fn test_empty_data_is_empty_array() {
        let attacher = ManyAttacher::new(test_registry());
        assert_eq!(attacher.data().unwrap(), serde_json::json!([]));
    }
}
