//! # mule-attach: Attachment lifecycle for MuleRS
//!
//! `mule-attach` lets an application attach binary content (images,
//! documents) to a persistent record without embedding raw bytes in the
//! database. Content is written to a pluggable [`mule_store`] backend,
//! referenced by a compact [`UploadedFile`] value, and promoted from a
//! temporary cache location to a permanent store location once the owning
//! record is durably saved.
//!
//! ## Key Features
//!
//! - **No orphans, no dangling references**: superseded objects are deleted
//!   only after the owning record's write has durably succeeded
//! - **Metadata pipeline**: composable analyzers extract size, MIME type and
//!   filename, and double as the validation checkpoint before any byte
//!   reaches storage
//! - **Storage agnostic**: everything resolves backends by key through a
//!   [`StorageRegistry`](mule_store::StorageRegistry)
//! - **Two cardinalities**: [`Attacher`] for one file per field,
//!   [`ManyAttacher`] for ordered collections
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use mule_attach::{Attacher, UploadOptions};
//! use mule_store::{MemoryStorage, StorageRegistry, CACHE, STORE};
//!
//! # #[tokio::main]
//! # async fn main() -> mule_attach::AttachResult<()> {
//! let registry = Arc::new(
//!     StorageRegistry::new()
//!         .register(CACHE, MemoryStorage::new())
//!         .register(STORE, MemoryStorage::new()),
//! );
//!
//! let mut avatar = Attacher::new(registry.clone());
//!
//! // Caller attaches a file; it lands in cache storage
//! avatar
//!     .attach_bytes(&b"png bytes"[..], &UploadOptions::new().with_filename("me.png"))
//!     .await?;
//!
//! // Record layer hooks, in order around its own storage write:
//! avatar.promote().await?;   // before save
//! // ... record row written durably here ...
//! avatar.persist().await?;   // after save
//! # Ok(())
//! # }
//! ```

mod analyzer;
mod attacher;
mod error;
mod extractor;
mod file;
mod lifecycle;
mod many;
mod metadata;
mod uploader;

// Re-export main types for clean API
pub use analyzer::{
    mime_for_extension, sniff_mime, Analyzer, AnalyzerInput, ChecksumAnalyzer, FilenameAnalyzer,
    MimeAnalyzer, MimeDetection, SizeAnalyzer, SizeLimitAnalyzer,
};
pub use attacher::{Attacher, AttachmentState};
pub use error::{AttachError, AttachResult};
pub use extractor::Extractor;
pub use file::UploadedFile;
pub use lifecycle::{AttachmentField, Lifecycle};
pub use many::ManyAttacher;
pub use metadata::{extension_of, Metadata};
pub use uploader::{
    DatePartitionedLocation, LocationStrategy, RandomLocation, UploadOptions, Uploader,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AttachError, AttachResult, Attacher, AttachmentState, Extractor, Lifecycle, ManyAttacher,
        Metadata, UploadOptions, UploadedFile, Uploader,
    };
    pub use mule_store::prelude::*;
}
