use std::sync::Arc;

use bytes::Bytes;
use chrono::Datelike;
use tracing::debug;
use uuid::Uuid;

use mule_store::{collect_stream, ByteStream, Content, StorageRegistry};

use crate::{AttachResult, Extractor, Metadata, UploadedFile};

/// Caller-supplied context for one upload
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Original filename, recorded into metadata and used for extension
    /// derivation
    pub filename: Option<String>,

    /// Externally supplied content type (trusted only when the extractor is
    /// configured to)
    pub content_type: Option<String>,

    /// Explicit storage id, overriding the location strategy
    pub location: Option<String>,
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_location<S: Into<String>>(mut self, location: S) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Strategy for generating storage ids.
///
/// Implementations must never produce the same id twice; uploads never
/// overwrite one another.
pub trait LocationStrategy: Send + Sync {
    fn location(&self, metadata: &Metadata) -> String;
}

/// Default strategy: a random token, suffixed with the derived extension
/// when one exists
#[derive(Debug, Clone)]
pub struct RandomLocation;

impl LocationStrategy for RandomLocation {
    fn location(&self, metadata: &Metadata) -> String {
        let token = Uuid::new_v4().simple().to_string();
        match metadata.extension() {
            Some(ext) => format!("{}.{}", token, ext),
            None => token,
        }
    }
}

/// Date-partitioned strategy: `prefix/yyyy/mm/token.ext`
#[derive(Debug, Clone)]
pub struct DatePartitionedLocation {
    prefix: String,
}

impl DatePartitionedLocation {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl LocationStrategy for DatePartitionedLocation {
    fn location(&self, metadata: &Metadata) -> String {
        let now = chrono::Utc::now();
        let token = RandomLocation.location(metadata);
        format!(
            "{}/{:04}/{:02}/{}",
            self.prefix.trim_end_matches('/'),
            now.year(),
            now.month(),
            token
        )
    }
}

/// Orchestrates one upload: extract metadata, generate a location, write
/// bytes, return a reference
pub struct Uploader {
    registry: Arc<StorageRegistry>,
    extractor: Extractor,
    locations: Arc<dyn LocationStrategy>,
}

impl Uploader {
    pub fn new(registry: Arc<StorageRegistry>) -> Self {
        Self {
            registry,
            extractor: Extractor::default(),
            locations: Arc::new(RandomLocation),
        }
    }

    /// Replace the extraction pipeline
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replace the location strategy
    pub fn with_locations<L: LocationStrategy + 'static>(mut self, locations: L) -> Self {
        self.locations = Arc::new(locations);
        self
    }

    pub fn registry(&self) -> &Arc<StorageRegistry> {
        &self.registry
    }

    /// Upload a stream into the backend registered under `storage_key`.
    ///
    /// Extraction runs first; a validation rejection means no bytes were
    /// written anywhere.
    pub async fn upload(
        &self,
        content: ByteStream,
        storage_key: &str,
        options: &UploadOptions,
    ) -> AttachResult<UploadedFile> {
        let bytes = collect_stream(content)
            .await
            .map_err(mule_store::StorageError::from)?;
        self.upload_bytes(bytes, storage_key, options).await
    }

    /// Upload already-buffered bytes; see [`Uploader::upload`]
    pub async fn upload_bytes(
        &self,
        content: impl Into<Bytes>,
        storage_key: &str,
        options: &UploadOptions,
    ) -> AttachResult<UploadedFile> {
        let bytes = content.into();
        let storage = self.registry.get(storage_key)?;

        let metadata = self.extractor.extract(
            &bytes,
            options.filename.as_deref(),
            options.content_type.as_deref(),
        )?;

        let id = options
            .location
            .clone()
            .unwrap_or_else(|| self.locations.location(&metadata));

        storage.upload(Content::Bytes(bytes), &id).await?;

        debug!(storage_key, id = %id, size = ?metadata.size, "Uploaded object");
        Ok(UploadedFile::new(id, storage_key, metadata))
    }

    /// Re-upload the bytes behind `file` into `to_storage_key`, removing the
    /// source object.
    ///
    /// Within a single backend this is an atomic rename; across backends it
    /// streams to the destination and then deletes the source. Metadata is
    /// carried over unchanged; the id is regenerated.
    pub async fn move_to(
        &self,
        file: &UploadedFile,
        to_storage_key: &str,
    ) -> AttachResult<UploadedFile> {
        let destination = self.registry.get(to_storage_key)?;
        let id = self.locations.location(&file.metadata);

        if file.storage_key == to_storage_key {
            destination
                .upload(Content::moved(file.id.clone()), &id)
                .await?;
        } else {
            let source = self.registry.get(&file.storage_key)?;
            let stream = source.open(&file.id).await?;
            destination.upload(Content::Stream(stream), &id).await?;
            source.delete(&file.id).await?;
        }

        debug!(
            from_storage = %file.storage_key,
            from_id = %file.id,
            to_storage = to_storage_key,
            to_id = %id,
            "Moved object"
        );
        Ok(UploadedFile::new(id, to_storage_key, file.metadata.clone()))
    }
}
