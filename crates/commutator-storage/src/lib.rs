//! Commutator Storage Library
//!
//! Ephemeral storage for uploaded PDF payloads. Every saved file gets a deferred
//! deletion owned by the store; the request pipeline normally discards files first and
//! the periodic directory sweep catches anything both of them miss. Double deletion is
//! a no-op on every path.
//!
//! File names are `{label}_{uuid}.pdf` inside a single flat directory.

pub mod local;
pub mod pdf;
pub mod sweep;
pub mod traits;

// Re-export commonly used types
pub use local::{FileStore, FileStoreConfig};
pub use pdf::{sniff_mime, validate_pdf, PDF_MAGIC, PDF_MIME};
pub use sweep::{cleanup_older_than, SweepReport};
pub use traits::{StorageError, StorageResult, UploadStore};
