use commutator_core::models::TemplatePart;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no {} template for language '{language}'", .part.as_str())]
    MissingTemplate {
        part: TemplatePart,
        language: String,
    },

    #[error("failed to read template {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Delivery failure on one channel. Logged by the dispatcher, never surfaced to clients.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel not configured: {0}")]
    NotConfigured(&'static str),

    #[error("invalid recipient '{address}': {reason}")]
    InvalidRecipient { address: String, reason: String },

    /// Template absent or unreadable; the inner error says which.
    #[error(transparent)]
    Template(#[from] RenderError),

    #[error("message too long: {length} characters exceeds {max}")]
    MessageTooLong { length: usize, max: usize },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("api error (status {status}): {description}")]
    Api { status: u16, description: String },
}

impl ChannelError {
    /// Failures caused by missing tenant configuration rather than delivery problems.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ChannelError::NotConfigured(_))
    }
}
