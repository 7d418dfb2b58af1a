//! Commutator Core Library
//!
//! This crate provides the domain models, error types, configuration and the tenant
//! registry shared by every Commutator component.

pub mod config;
pub mod error;
pub mod models;
pub mod registry;

// Re-export commonly used types
pub use config::{validate_env, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    ConsentRecord, CookieConsentRequest, OrderRecord, OrderRequest, PdfPayload, PendingUpload,
    TenantProfile,
};
pub use registry::{negotiate_language, TenantRegistry};
