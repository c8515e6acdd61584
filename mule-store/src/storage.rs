use async_trait::async_trait;

use crate::{ByteStream, Content, StoreResult, UrlOptions};

/// Core storage operations - must be implemented by all storage backends
///
/// Ids are backend-relative (a path or object key) and form a flat namespace
/// per backend. All operations are safe to call concurrently for distinct
/// ids; concurrent writers to the same id get last-write-wins semantics.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `content` under `id`, replacing any existing object.
    ///
    /// A failed upload must not leave a partially written object visible
    /// under `id`.
    async fn upload(&self, content: Content, id: &str) -> StoreResult<()>;

    /// Open the object under `id` as a lazy stream.
    ///
    /// Fails with [`StorageError::NotFound`](crate::StorageError::NotFound)
    /// when no such object exists. Filesystem and object-store backends
    /// read on demand rather than buffering the whole object.
    async fn open(&self, id: &str) -> StoreResult<ByteStream>;

    /// Check whether an object exists under `id`
    async fn exists(&self, id: &str) -> StoreResult<bool>;

    /// Delete the object under `id`. Deleting a missing id is not an error.
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Delete every object whose id starts with `prefix`.
    ///
    /// Used for directory/key-namespace cleanup; succeeds when nothing
    /// matches.
    async fn delete_prefixed(&self, prefix: &str) -> StoreResult<()>;

    /// Build an access URL for the object under `id`.
    ///
    /// Object-store backends produce a signed, time-limited URL when
    /// `options.expires_in` is set. Unrecognized options are ignored.
    async fn url(&self, id: &str, options: &UrlOptions) -> StoreResult<String>;
}
