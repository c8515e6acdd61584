//! Conformance tests for the filesystem storage backend.

use bytes::Bytes;
use mule_store::{collect_stream, ByteStream, Content, FileSystemStorage, Storage, UrlOptions};
use tempfile::TempDir;

fn chunked_stream(chunks: &[&'static [u8]]) -> ByteStream {
    let items: Vec<Result<Bytes, std::io::Error>> = chunks
        .iter()
        .map(|chunk| Ok(Bytes::from_static(chunk)))
        .collect();
    Box::pin(futures_util::stream::iter(items))
}

#[tokio::test]
async fn test_upload_open_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    storage
        .upload(Content::bytes(&b"Hello, world!"[..]), "docs/hello.txt")
        .await
        .unwrap();

    let stream = storage.open("docs/hello.txt").await.unwrap();
    let bytes = collect_stream(stream).await.unwrap();
    assert_eq!(bytes.as_ref(), b"Hello, world!");
}

#[tokio::test]
async fn test_upload_from_stream() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    storage
        .upload(
            Content::stream(chunked_stream(&[b"chunk one, ", b"chunk two"])),
            "streamed.bin",
        )
        .await
        .unwrap();

    let bytes = collect_stream(storage.open("streamed.bin").await.unwrap())
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), b"chunk one, chunk two");
}

#[tokio::test]
async fn test_failed_stream_leaves_no_object() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let items: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(b"partial")),
        Err(std::io::Error::other("connection reset")),
    ];
    let stream: ByteStream = Box::pin(futures_util::stream::iter(items));

    let result = storage.upload(Content::stream(stream), "broken.bin").await;
    assert!(result.is_err());
    assert!(!storage.exists("broken.bin").await.unwrap());
}

#[tokio::test]
async fn test_open_missing_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let err = storage.open("nope.txt").await.err().unwrap();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_move_renames_within_backend() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    storage
        .upload(Content::bytes(&b"payload"[..]), "cache/item.bin")
        .await
        .unwrap();

    storage
        .upload(Content::moved("cache/item.bin"), "store/item.bin")
        .await
        .unwrap();

    assert!(!storage.exists("cache/item.bin").await.unwrap());
    let bytes = collect_stream(storage.open("store/item.bin").await.unwrap())
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), b"payload");
}

#[tokio::test]
async fn test_move_missing_source_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let err = storage
        .upload(Content::moved("ghost.bin"), "dest.bin")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    storage
        .upload(Content::bytes(&b"x"[..]), "one.txt")
        .await
        .unwrap();

    storage.delete("one.txt").await.unwrap();
    storage.delete("one.txt").await.unwrap();
    assert!(!storage.exists("one.txt").await.unwrap());
}

#[tokio::test]
async fn test_delete_prefixed_removes_namespace() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    storage
        .upload(Content::bytes(&b"1"[..]), "tmp/a.bin")
        .await
        .unwrap();
    storage
        .upload(Content::bytes(&b"2"[..]), "tmp/nested/b.bin")
        .await
        .unwrap();
    storage
        .upload(Content::bytes(&b"3"[..]), "kept.bin")
        .await
        .unwrap();

    storage.delete_prefixed("tmp/").await.unwrap();

    assert!(!storage.exists("tmp/a.bin").await.unwrap());
    assert!(!storage.exists("tmp/nested/b.bin").await.unwrap());
    assert!(storage.exists("kept.bin").await.unwrap());

    // Nothing matching is not an error
    storage.delete_prefixed("absent/").await.unwrap();
}

#[tokio::test]
async fn test_url_points_into_root() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let url = storage.url("a/b.png", &UrlOptions::new()).await.unwrap();
    assert!(url.starts_with("file://"));
    assert!(url.ends_with("a/b.png"));
}
