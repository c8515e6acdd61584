use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use mule_store::{ByteStream, StorageRegistry, UrlOptions, CACHE, STORE};

use crate::{AttachResult, UploadOptions, UploadedFile, Uploader};

/// Observable state of an attachment field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentState {
    /// No file attached
    Empty,
    /// Attached but not yet promoted; the object lives in cache storage
    Cached,
    /// Promoted; the object lives in store storage
    Stored,
}

/// Lifecycle state machine for one attachment field on one record instance.
///
/// The record layer drives it through a save cycle in this order:
/// `attach*` (zero or more) -> `promote` (before the record write) ->
/// `persist` (after the record write has durably succeeded) - and
/// `destroy_attached` when the record is destroyed. Operations on one
/// attacher must be invoked sequentially; attachers for distinct fields are
/// independent.
///
/// If the record write fails between `promote` and `persist`, the promoted
/// object is left unreferenced in store storage and the superseded object
/// stays intact: leaking a new object is preferred over deleting the only
/// copy of the old one.
pub struct Attacher {
    uploader: Uploader,
    cache_key: String,
    store_key: String,
    current: Option<UploadedFile>,
    previous: Option<UploadedFile>,
    dirty: bool,
}

impl Attacher {
    /// Create an empty attacher using the conventional "cache"/"store" keys
    pub fn new(registry: Arc<StorageRegistry>) -> Self {
        Self {
            uploader: Uploader::new(registry),
            cache_key: CACHE.to_string(),
            store_key: STORE.to_string(),
            current: None,
            previous: None,
            dirty: false,
        }
    }

    /// Create an attacher holding a previously persisted reference
    pub fn from_loaded(registry: Arc<StorageRegistry>, loaded: Option<UploadedFile>) -> Self {
        let mut attacher = Self::new(registry);
        attacher.current = loaded;
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

    pub fn state(&self) -> AttachmentState {
        match &self.current {
            None => AttachmentState::Empty,
            Some(file) if file.storage_key == self.cache_key => AttachmentState::Cached,
            Some(_) => AttachmentState::Stored,
        }
    }

    /// Currently attached file, if any
    pub fn file(&self) -> Option<&UploadedFile> {
        self.current.as_ref()
    }

    /// Reference superseded by a not-yet-persisted change, if any
    pub fn previous(&self) -> Option<&UploadedFile> {
        self.previous.as_ref()
    }

    /// True when the attachment has changed since the last successful persist
    pub fn changed(&self) -> bool {
        self.dirty
    }

    /// Attach a new file: upload the stream to cache storage and make it
    /// current.
    ///
    /// A previously current file moves to `previous` for deferred cleanup at
    /// [`Attacher::persist`]. Upload failures leave the attachment state
    /// untouched.
    pub async fn attach(
        &mut self,
        content: ByteStream,
        options: &UploadOptions,
    ) -> AttachResult<()> {
        let uploaded = self
            .uploader
            .upload(content, &self.cache_key, options)
            .await?;
        self.replace_current(uploaded);
        Ok(())
    }

    /// Attach already-buffered bytes; see [`Attacher::attach`]
    pub async fn attach_bytes(
        &mut self,
        content: impl Into<Bytes>,
        options: &UploadOptions,
    ) -> AttachResult<()> {
        let uploaded = self
            .uploader
            .upload_bytes(content, &self.cache_key, options)
            .await?;
        self.replace_current(uploaded);
        Ok(())
    }

    /// Detach the current file, deferring deletion to [`Attacher::persist`].
    /// A no-op when nothing is attached.
    pub fn attach_none(&mut self) {
        if self.current.is_none() {
            return;
        }
        self.previous = self.current.take();
        self.dirty = true;
        debug!("Detached file");
    }

    fn replace_current(&mut self, uploaded: UploadedFile) {
        if let Some(old) = self.current.take() {
            self.previous = Some(old);
        }
        debug!(id = %uploaded.id, storage_key = %uploaded.storage_key, "Attached file");
        self.current = Some(uploaded);
        self.dirty = true;
    }

    /// Move the current file from cache storage to store storage.
    ///
    /// Intended for the record layer's before-save hook. A no-op (not an
    /// error) unless the state is `Cached`.
    pub async fn promote(&mut self) -> AttachResult<()> {
        let promoted = match &self.current {
            Some(file) if file.storage_key == self.cache_key => {
                let promoted = self.uploader.move_to(file, &self.store_key).await?;
                debug!(from = %file.id, to = %promoted.id, "Promoted file");
                promoted
            }
            _ => return Ok(()),
        };
        self.current = Some(promoted);
        Ok(())
    }

    /// Clean up after the owning record has durably persisted the current
    /// reference: delete the superseded object and clear the dirty flag.
    ///
    /// Intended for the record layer's after-save hook; must only run once
    /// the record write has succeeded. An already-absent superseded object
    /// counts as cleaned up. Failures leave state unchanged.
    pub async fn persist(&mut self) -> AttachResult<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(previous) = self.previous.take() {
            if let Err(err) = previous.delete(self.uploader.registry()).await {
                self.previous = Some(previous);
                return Err(err);
            }
            debug!(id = %previous.id, "Deleted superseded file");
        }

        self.dirty = false;
        Ok(())
    }

    /// Delete the current file's backing object.
    ///
    /// Intended for the record layer's after-destroy hook. The in-memory
    /// reference is left in place.
    pub async fn destroy_attached(&mut self) -> AttachResult<()> {
        if let Some(file) = &self.current {
            file.delete(self.uploader.registry()).await?;
            debug!(id = %file.id, "Destroyed attached file");
        }
        Ok(())
    }

    /// Access URL for the current file, if one is attached
    pub async fn url(&self, options: &UrlOptions) -> AttachResult<Option<String>> {
        match &self.current {
            Some(file) => Ok(Some(file.url(self.uploader.registry(), options).await?)),
            None => Ok(None),
        }
    }

    /// Persistable representation: the current reference as a JSON object,
    /// or `null` when empty
    pub fn data(&self) -> AttachResult<serde_json::Value> {
        Ok(serde_json::to_value(&self.current)?)
    }

    /// Rebuild an attacher from a persisted representation
    pub fn load(registry: Arc<StorageRegistry>, data: serde_json::Value) -> AttachResult<Self> {
        let loaded: Option<UploadedFile> = serde_json::from_value(data)?;
        Ok(Self::from_loaded(registry, loaded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Metadata;
    use mule_store::MemoryStorage;

    fn test_registry() -> Arc<StorageRegistry> {
        Arc::new(
            StorageRegistry::new()
                .register(CACHE, MemoryStorage::new())
                .register(STORE, MemoryStorage::new()),
        )
    }

    #[tokio::test]
    async fn test_attach_caches_and_marks_dirty() {
        let mut attacher = Attacher::new(test_registry());
        assert_eq!(attacher.state(), AttachmentState::Empty);
        assert!(!attacher.changed());

        attacher
            .attach_bytes(&b"hello"[..], &UploadOptions::new().with_filename("a.txt"))
            .await
            .unwrap();

        assert_eq!(attacher.state(), AttachmentState::Cached);
        assert!(attacher.changed());
        assert!(attacher.previous().is_none());
    }

    #[tokio::test]
    async fn test_replacement_defers_old_to_previous() {
        let mut attacher = Attacher::new(test_registry());
        attacher
            .attach_bytes(&b"one"[..], &UploadOptions::new())
            .await
            .unwrap();
        let first_id = attacher.file().unwrap().id.clone();

        attacher
            .attach_bytes(&b"two"[..], &UploadOptions::new())
            .await
            .unwrap();

        assert_eq!(attacher.previous().unwrap().id, first_id);
        assert_ne!(attacher.file().unwrap().id, first_id);
    }

    #[tokio::test]
    async fn test_attach_none_from_empty_is_noop() {
        let mut attacher = Attacher::new(test_registry());
        attacher.attach_none();

        assert_eq!(attacher.state(), AttachmentState::Empty);
        assert!(!attacher.changed());
    }

    #[tokio::test]
    async fn test_promote_noop_unless_cached() {
        let registry = test_registry();

        let mut empty = Attacher::new(registry.clone());
        empty.promote().await.unwrap();
        assert_eq!(empty.state(), AttachmentState::Empty);

        let stored = UploadedFile::new("kept.bin", STORE, Metadata::new());
        let mut loaded = Attacher::from_loaded(registry, Some(stored.clone()));
        loaded.promote().await.unwrap();
        assert_eq!(loaded.file().unwrap(), &stored);
    }

    #[tokio::test]
    async fn test_persist_without_changes_is_noop() {
        let mut attacher = Attacher::new(test_registry());
        attacher.persist().await.unwrap();
        assert!(!attacher.changed());
    }

    #[tokio::test]
    async fn test_data_roundtrip() {
        let registry = test_registry();
        let mut attacher = Attacher::new(registry.clone());
        attacher
            .attach_bytes(&b"hello"[..], &UploadOptions::new().with_filename("a.txt"))
            .await
            .unwrap();

        let data = attacher.data().unwrap();
        let reloaded = Attacher::load(registry, data).unwrap();

        assert_eq!(reloaded.file(), attacher.file());
        assert!(!reloaded.changed());
    }

    #[tokio::test]
    async fn test_empty_data_is_null() {
        let attacher = Attacher::new(test_registry());
        assert_eq!(attacher.data().unwrap(), serde_json::Value::Null);
    }
}
