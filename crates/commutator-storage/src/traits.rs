//! Upload store abstraction
//!
//! The intake pipeline talks to this trait so tests can substitute a store that fails
//! on demand.

use async_trait::async_trait;
use commutator_core::PendingUpload;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File too large: {size} bytes exceeds max {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid file type: detected {detected}")]
    InvalidType { detected: String },

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Validate, persist and schedule deletion of `data` under `label`.
    async fn save(&self, data: &[u8], label: &str) -> StorageResult<PendingUpload>;

    /// Delete the file if it still exists and cancel its deferred deletion.
    /// Returns whether a file was actually removed.
    async fn discard(&self, upload: &PendingUpload) -> StorageResult<bool>;
}
