use chrono::{DateTime, Utc};
use std::path::PathBuf;
use uuid::Uuid;

/// A validated payload written to the temp directory, awaiting delivery and deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub id: Uuid,
    pub path: PathBuf,
    /// Logical name, e.g. "invoice"
    pub label: String,
    pub file_name: String,
    pub size: u64,
    /// Hex-encoded SHA-256 of the content
    pub sha256: String,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
