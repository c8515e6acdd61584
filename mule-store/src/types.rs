use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::time::Duration;

/// Stream of bytes for stored content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Content handed to [`Storage::upload`](crate::Storage::upload)
pub enum Content {
    /// Arbitrary byte stream
    Stream(ByteStream),

    /// Fully buffered bytes
    Bytes(Bytes),

    /// Bytes already held by the *same* backend under `id`.
    ///
    /// Backends relocate these with an atomic rename or server-side copy
    /// instead of copy-then-delete. The source id no longer exists after a
    /// successful upload.
    Move { id: String },
}

impl Content {
    /// Wrap a stream
    pub fn stream(stream: ByteStream) -> Self {
        Self::Stream(stream)
    }

    /// Wrap buffered bytes
    pub fn bytes<B: Into<Bytes>>(bytes: B) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Reference bytes already stored under `id` in the receiving backend
    pub fn moved<S: Into<String>>(id: S) -> Self {
        Self::Move { id: id.into() }
    }
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Content::Stream(_) => f.write_str("Content::Stream(..)"),
            Content::Bytes(bytes) => write!(f, "Content::Bytes({} bytes)", bytes.len()),
            Content::Move { id } => write!(f, "Content::Move {{ id: {:?} }}", id),
        }
    }
}

/// Drain a stream into a single buffer
pub async fn collect_stream(mut stream: ByteStream) -> Result<Bytes, std::io::Error> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

/// Wrap already-buffered bytes as a single-chunk stream
pub fn bytes_stream(bytes: Bytes) -> ByteStream {
    Box::pin(futures_util::stream::once(async move { Ok(bytes) }))
}

/// Options for [`Storage::url`](crate::Storage::url)
///
/// Backends ignore options they don't understand.
#[derive(Debug, Clone, Default)]
pub struct UrlOptions {
    /// Lifetime for signed URLs (object-store backends only)
    pub expires_in: Option<Duration>,

    /// Backend-specific pass-through options
    pub extra: BTreeMap<String, String>,
}

impl UrlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    pub fn with_option<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_stream_roundtrip() {
        let stream = bytes_stream(Bytes::from_static(b"hello world"));
        let collected = collect_stream(stream).await.unwrap();
        assert_eq!(collected.as_ref(), b"hello world");
    }

    #[tokio::test]
    async fn test_collect_stream_multiple_chunks() {
        let chunks = vec![
            Ok(Bytes::from_static(b"he")),
            Ok(Bytes::from_static(b"llo")),
        ];
        let stream: ByteStream = Box::pin(futures_util::stream::iter(chunks));
        let collected = collect_stream(stream).await.unwrap();
        assert_eq!(collected.as_ref(), b"hello");
    }

    #[test]
    fn test_url_options_builder() {
        let options = UrlOptions::new()
            .with_expires_in(Duration::from_secs(900))
            .with_option("response_content_type", "image/png");

        assert_eq!(options.expires_in, Some(Duration::from_secs(900)));
        assert_eq!(
            options.extra.get("response_content_type").map(String::as_str),
            Some("image/png")
        );
    }
}
