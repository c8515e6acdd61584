use thiserror::Error;

use mule_store::StorageError;

/// Result type for attachment operations
pub type AttachResult<T> = Result<T, AttachError>;

/// Errors that can occur while extracting, uploading, or managing attachments
#[derive(Error, Debug)]
pub enum AttachError {
    /// The content was rejected by an analyzer. Carries a human-readable
    /// reason suitable for a validation message; distinct from transport
    /// failures so callers can tell "fix your file" from "try again".
    #[error("Invalid file: {reason}")]
    InvalidFile { reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl AttachError {
    /// Create a validation rejection
    pub fn invalid_file<S: Into<String>>(reason: S) -> Self {
        Self::InvalidFile {
            reason: reason.into(),
        }
    }

    /// True when the error is a validation rejection rather than a
    /// transport failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidFile { .. })
    }
}
