use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Metadata describing one stored object.
///
/// The three well-known fields serialize as explicit nulls when absent so
/// that serialized metadata round-trips to an equal value. Analyzer-contributed
/// extras live alongside them at the top level of the serialized object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub filename: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_mime_type<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_extra<K: Into<String>, V: Into<serde_json::Value>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Lowercased extension derived from the filename, without the dot.
    ///
    /// `None` for a missing filename or one without a dot-suffix.
    pub fn extension(&self) -> Option<String> {
        self.filename.as_deref().and_then(extension_of)
    }
}

/// Lowercased extension of a path-like name, without the dot.
///
/// Names with no dot-suffix, dotfiles, and empty names all yield `None`.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of_tolerates_missing_suffix() {
        assert_eq!(extension_of("photo.JPG"), Some("jpg".to_string()));
        assert_eq!(extension_of("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of(".hidden"), None);
        assert_eq!(extension_of(""), None);
    }

    #[test]
    fn test_extension_without_filename() {
        let metadata = Metadata::new().with_size(10);
        assert_eq!(metadata.extension(), None);
    }

    #[test]
    fn test_absent_fields_serialize_as_nulls() {
        let metadata = Metadata::new().with_filename("a.txt");
        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["size"], serde_json::Value::Null);
        assert_eq!(json["mime_type"], serde_json::Value::Null);
        assert_eq!(json["filename"], "a.txt");
    }

    #[test]
    fn test_serde_roundtrip_with_extras() {
        let metadata = Metadata::new()
            .with_size(42)
            .with_mime_type("image/png")
            .with_filename("cat.png")
            .with_extra("checksum", "abc123")
            .with_extra("width", 800);

        let json = serde_json::to_string(&metadata).unwrap();
        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }
}
