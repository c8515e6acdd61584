use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::{extension_of, AttachError, AttachResult, Metadata};

/// Input handed to each analyzer in the pipeline.
///
/// `content` is the full buffered upload, so every analyzer reads from the
/// start regardless of what ran before it.
#[derive(Debug)]
pub struct AnalyzerInput<'a> {
    pub content: &'a Bytes,
    /// Caller-supplied original filename, if any
    pub filename: Option<&'a str>,
    /// Externally supplied content type (e.g. from a multipart part)
    pub content_type: Option<&'a str>,
}

/// One step of the metadata-extraction pipeline.
///
/// Analyzers contribute zero or more metadata fields and may reject the
/// upload outright with [`AttachError::InvalidFile`]; extraction runs before
/// any bytes are committed to storage, so a rejection is also a validation
/// failure.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, input: &AnalyzerInput<'_>, metadata: &mut Metadata) -> AttachResult<()>;
}

/// Records the byte length of the content
pub struct SizeAnalyzer;

impl Analyzer for SizeAnalyzer {
    fn analyze(&self, input: &AnalyzerInput<'_>, metadata: &mut Metadata) -> AttachResult<()> {
        metadata.size = Some(input.content.len() as u64);
        Ok(())
    }
}

/// Records the caller-supplied filename
pub struct FilenameAnalyzer;

impl Analyzer for FilenameAnalyzer {
    fn analyze(&self, input: &AnalyzerInput<'_>, metadata: &mut Metadata) -> AttachResult<()> {
        if let Some(filename) = input.filename {
            metadata.filename = Some(filename.to_string());
        }
        Ok(())
    }
}

/// How the MIME type is determined, selectable per uploader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MimeDetection {
    /// Sniff magic bytes from the content itself
    #[default]
    Sniff,
    /// Look up the filename extension
    Extension,
    /// Trust the externally supplied content type
    Trust,
}

/// Determines the MIME type; leaves it absent when detection comes up empty
pub struct MimeAnalyzer {
    detection: MimeDetection,
}

impl MimeAnalyzer {
    pub fn new(detection: MimeDetection) -> Self {
        Self { detection }
    }
}

impl Default for MimeAnalyzer {
    fn default() -> Self {
        Self::new(MimeDetection::default())
    }
}

impl Analyzer for MimeAnalyzer {
    fn analyze(&self, input: &AnalyzerInput<'_>, metadata: &mut Metadata) -> AttachResult<()> {
        let mime = match self.detection {
            MimeDetection::Sniff => sniff_mime(input.content),
            MimeDetection::Extension => input
                .filename
                .and_then(extension_of)
                .as_deref()
                .and_then(mime_for_extension),
            MimeDetection::Trust => input.content_type,
        };

        if let Some(mime) = mime {
            metadata.mime_type = Some(mime.to_string());
        }
        Ok(())
    }
}

/// SHA-256 of the content, hex-encoded into `extra["checksum"]`
pub struct ChecksumAnalyzer;

impl Analyzer for ChecksumAnalyzer {
    fn analyze(&self, input: &AnalyzerInput<'_>, metadata: &mut Metadata) -> AttachResult<()> {
        let mut hasher = Sha256::new();
        hasher.update(input.content);
        let digest = format!("{:x}", hasher.finalize());
        metadata.extra.insert("checksum".to_string(), digest.into());
        Ok(())
    }
}

/// Rejects content larger than a fixed byte limit
pub struct SizeLimitAnalyzer {
    max_bytes: u64,
}

impl SizeLimitAnalyzer {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

impl Analyzer for SizeLimitAnalyzer {
    fn analyze(&self, input: &AnalyzerInput<'_>, _metadata: &mut Metadata) -> AttachResult<()> {
        let size = input.content.len() as u64;
        if size > self.max_bytes {
            return Err(AttachError::invalid_file(format!(
                "Content is {} bytes, larger than the {} byte limit",
                size, self.max_bytes
            )));
        }
        Ok(())
    }
}

/// Identify a MIME type from leading magic bytes.
///
/// Unknown signatures fall back to `text/plain` when the head of the content
/// looks like UTF-8 text, otherwise to nothing.
pub fn sniff_mime(content: &[u8]) -> Option<&'static str> {
    if content.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some("image/png");
    }
    if content.starts_with(b"\xff\xd8\xff") {
        return Some("image/jpeg");
    }
    if content.starts_with(b"GIF87a") || content.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if content.len() >= 12 && &content[0..4] == b"RIFF" && &content[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if content.starts_with(b"%PDF-") {
        return Some("application/pdf");
    }
    if content.starts_with(b"PK\x03\x04") {
        return Some("application/zip");
    }
    if content.starts_with(b"\x1f\x8b") {
        return Some("application/gzip");
    }

    let head = &content[..content.len().min(512)];
    if !head.is_empty() && std::str::from_utf8(head).is_ok() {
        return Some("text/plain");
    }

    None
}

/// Look up a MIME type by lowercased filename extension
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => return None,
    };
    Some(mime)
}
