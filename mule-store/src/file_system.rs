use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::{ByteStream, Content, Storage, StorageError, StoreResult, UrlOptions};

/// Local filesystem backend
///
/// Ids are paths relative to the root directory. Writes land in a `.tmp`
/// sibling first and are published with a rename, so a failed upload never
/// leaves a partial object visible under its id.
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    /// Create a filesystem backend rooted at `root`, creating the directory
    /// if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of this backend
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    fn tmp_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        path.with_file_name(name)
    }

    async fn ensure_parent(path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_stream(path: &Path, mut stream: ByteStream) -> StoreResult<()> {
        let tmp = Self::tmp_path(path);
        let mut file = tokio::fs::File::create(&tmp).await?;

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => file.write_all(&chunk).await?,
                Err(err) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&tmp).await;
                    return Err(err.into());
                }
            }
        }

        file.flush().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for FileSystemStorage {
    async fn upload(&self, content: Content, id: &str) -> StoreResult<()> {
        let path = self.resolve(id);
        Self::ensure_parent(&path).await?;

        match content {
            Content::Move { id: from_id } => {
                let from = self.resolve(&from_id);
                tokio::fs::rename(&from, &path).await.map_err(|err| {
                    if err.kind() == std::io::ErrorKind::NotFound {
                        StorageError::not_found(&from_id)
                    } else {
                        err.into()
                    }
                })?;
                debug!(from = %from.display(), to = %path.display(), "Moved object");
            }
            Content::Bytes(bytes) => {
                Self::write_stream(&path, crate::types::bytes_stream(bytes)).await?;
                debug!(path = %path.display(), "Stored object");
            }
            Content::Stream(stream) => {
                Self::write_stream(&path, stream).await?;
                debug!(path = %path.display(), "Stored object");
            }
        }

        Ok(())
    }

    async fn open(&self, id: &str) -> StoreResult<ByteStream> {
        let path = self.resolve(id);
        let file = tokio::fs::File::open(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StorageError::not_found(id)
            } else {
                err.into()
            }
        })?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn exists(&self, id: &str) -> StoreResult<bool> {
        Ok(tokio::fs::try_exists(self.resolve(id)).await.unwrap_or(false))
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let path = self.resolve(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted object");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_prefixed(&self, prefix: &str) -> StoreResult<()> {
        // Prefixes name directory namespaces on this backend
        let path = self.resolve(prefix.trim_end_matches('/'));
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted prefix");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn url(&self, id: &str, _options: &UrlOptions) -> StoreResult<String> {
        Ok(format!("file://{}", self.resolve(id).display()))
    }
}
