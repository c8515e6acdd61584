use bytes::Bytes;
use serde::{Deserialize, Serialize};

use mule_store::{collect_stream, ByteStream, StorageRegistry, UrlOptions};

use crate::{extension_of, AttachResult, Metadata};

/// Immutable reference to one stored object.
///
/// `id` is backend-relative; `storage_key` names which registered backend
/// holds the object. Two references are equal iff `id` and `storage_key`
/// match - metadata is informational, not identity-bearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub storage_key: String,
    pub metadata: Metadata,
}

impl PartialEq for UploadedFile {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.storage_key == other.storage_key
    }
}

impl Eq for UploadedFile {}

impl std::hash::Hash for UploadedFile {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.storage_key.hash(state);
    }
}

impl UploadedFile {
    pub fn new<I, K>(id: I, storage_key: K, metadata: Metadata) -> Self
    where
        I: Into<String>,
        K: Into<String>,
    {
        Self {
            id: id.into(),
            storage_key: storage_key.into(),
            metadata,
        }
    }

    /// Lowercased extension, derived from the id and falling back to the
    /// original filename. `None` when neither carries a dot-suffix.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.id).or_else(|| self.metadata.extension())
    }

    /// Open the backing object as a lazy stream
    pub async fn open(&self, registry: &StorageRegistry) -> AttachResult<ByteStream> {
        let storage = registry.get(&self.storage_key)?;
        Ok(storage.open(&self.id).await?)
    }

    /// Read the entire backing object into memory
    pub async fn read(&self, registry: &StorageRegistry) -> AttachResult<Bytes> {
        let stream = self.open(registry).await?;
        Ok(collect_stream(stream).await.map_err(mule_store::StorageError::from)?)
    }

    /// Check whether the backing object still exists
    pub async fn exists(&self, registry: &StorageRegistry) -> AttachResult<bool> {
        let storage = registry.get(&self.storage_key)?;
        Ok(storage.exists(&self.id).await?)
    }

    /// Delete the backing object; deleting an already-absent object succeeds
    pub async fn delete(&self, registry: &StorageRegistry) -> AttachResult<()> {
        let storage = registry.get(&self.storage_key)?;
        Ok(storage.delete(&self.id).await?)
    }

    /// Build an access URL for the backing object
    pub async fn url(&self, registry: &StorageRegistry, options: &UrlOptions) -> AttachResult<String> {
        let storage = registry.get(&self.storage_key)?;
        Ok(storage.url(&self.id, options).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_metadata() {
        let a = UploadedFile::new("x.png", "store", Metadata::new().with_size(1));
        let b = UploadedFile::new("x.png", "store", Metadata::new().with_size(999));
        let c = UploadedFile::new("x.png", "cache", Metadata::new().with_size(1));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_extension_prefers_id() {
        let file = UploadedFile::new(
            "abc123.png",
            "store",
            Metadata::new().with_filename("original.jpeg"),
        );
        assert_eq!(file.extension(), Some("png".to_string()));
    }

    #[test]
    fn test_extension_falls_back_to_filename() {
        let file = UploadedFile::new(
            "abc123",
            "store",
            Metadata::new().with_filename("original.jpeg"),
        );
        assert_eq!(file.extension(), Some("jpeg".to_string()));

        let bare = UploadedFile::new("abc123", "store", Metadata::new());
        assert_eq!(bare.extension(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let file = UploadedFile::new("a/b.txt", "cache", Metadata::new().with_size(5));
        let json = serde_json::to_value(&file).unwrap();

        assert_eq!(json["id"], "a/b.txt");
        assert_eq!(json["storage_key"], "cache");
        assert_eq!(json["metadata"]["size"], 5);
        assert_eq!(json["metadata"]["filename"], serde_json::Value::Null);
    }
}
