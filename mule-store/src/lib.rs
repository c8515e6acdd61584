//! # mule-store: Pluggable byte storage for MuleRS attachments
//!
//! `mule-store` provides the storage layer that MuleRS attachments sit on:
//! one streaming contract over byte storage, with in-memory, local
//! filesystem, and S3-compatible backends.
//!
//! ## Key Features
//!
//! - **One contract**: `upload`, `open`, `exists`, `delete`,
//!   `delete_prefixed`, `url` - implemented identically by every backend
//! - **Streaming-first**: `open` returns a lazy stream; filesystem and
//!   object-store backends never buffer whole objects
//! - **Atomic relocation**: `Content::Move` lets a backend rename in place
//!   instead of copy-then-delete
//! - **Explicit configuration**: backends are registered once in a
//!   [`StorageRegistry`] and resolved by key - no ambient global state
//!
//! ## Quick Start
//!
//! ```rust
//! use mule_store::{Content, MemoryStorage, Storage, StorageRegistry, CACHE, STORE};
//!
//! # #[tokio::main]
//! # async fn main() -> mule_store::StoreResult<()> {
//! let registry = StorageRegistry::new()
//!     .register(CACHE, MemoryStorage::new())
//!     .register(STORE, MemoryStorage::new());
//!
//! let cache = registry.get(CACHE)?;
//! cache.upload(Content::bytes(&b"hello"[..]), "greetings/hello.txt").await?;
//!
//! let stream = cache.open("greetings/hello.txt").await?;
//! let bytes = mule_store::collect_stream(stream).await?;
//! assert_eq!(bytes.as_ref(), b"hello");
//! # Ok(())
//! # }
//! ```

mod error;
mod file_system;
mod memory;
mod registry;
mod s3;
mod storage;
mod types;

// Re-export main types for clean API
pub use error::{StorageError, StoreResult};
pub use file_system::FileSystemStorage;
pub use memory::MemoryStorage;
pub use registry::{StorageRegistry, CACHE, STORE};
pub use s3::{S3Config, S3Storage};
pub use storage::Storage;
pub use types::{bytes_stream, collect_stream, ByteStream, Content, UrlOptions};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ByteStream, Content, Storage, StorageError, StorageRegistry, StoreResult, UrlOptions,
        CACHE, STORE,
    };
}
