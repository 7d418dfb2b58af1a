//! Request-level errors
//!
//! Everything that can fail an HTTP request ends up as an [`AppError`]. How each variant
//! is shown to clients lives in one table ([`Presentation`]) exposed through
//! [`ErrorMetadata`]. Delivery-channel failures are not represented here; the dispatcher
//! logs them and the caller never sees them.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected client mistakes
    Debug,
    /// Failures on our side
    Error,
}

/// How an error is presented over HTTP
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Machine-readable code, e.g. `"SERVICE_NOT_CONFIGURED"`
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same request can succeed
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show to the client
    fn client_message(&self) -> String;

    /// Hide internal details from the response body
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    /// Temp file could not be written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Payload decoded but failed field or document validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Request is missing something outside the body (e.g. a header)
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unknown service: {0}")]
    UnknownTenant(String),

    #[error("Internal error: {message}")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        tracing::debug!(errors = %err, "Field validation failed");
        AppError::InvalidInput("Missing required fields".to_string())
    }
}

/// Presentation row for one error category.
#[derive(Debug, Clone, Copy)]
struct Presentation {
    status: u16,
    code: &'static str,
    recoverable: bool,
    action: Option<&'static str>,
    sensitive: bool,
    level: LogLevel,
}

const RETRY_LATER: Option<&str> = Some("Retry after a short delay");

const CLIENT_MISTAKE: Presentation = Presentation {
    status: 400,
    code: "INVALID_INPUT",
    recoverable: false,
    action: Some("Fix the request payload and resubmit"),
    sensitive: false,
    level: LogLevel::Debug,
};

const SERVER_FAULT: Presentation = Presentation {
    status: 500,
    code: "INTERNAL_ERROR",
    recoverable: true,
    action: RETRY_LATER,
    sensitive: true,
    level: LogLevel::Error,
};

impl AppError {
    fn presentation(&self) -> Presentation {
        match self {
            AppError::Database(_) => Presentation {
                code: "DATABASE_ERROR",
                ..SERVER_FAULT
            },
            AppError::Storage(_) => Presentation {
                code: "STORAGE_ERROR",
                ..SERVER_FAULT
            },
            AppError::InvalidInput(_) => CLIENT_MISTAKE,
            AppError::BadRequest(_) => Presentation {
                code: "BAD_REQUEST",
                action: Some("Send the X-Service-Name header"),
                ..CLIENT_MISTAKE
            },
            AppError::UnknownTenant(_) => Presentation {
                code: "SERVICE_NOT_CONFIGURED",
                action: Some("Check the X-Service-Name header"),
                ..CLIENT_MISTAKE
            },
            AppError::InternalWithSource { .. } => SERVER_FAULT,
        }
    }

    /// Variant name, shown in responses only when details are enabled
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::BadRequest(_) => "BadRequest",
            AppError::UnknownTenant(_) => "UnknownTenant",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Display text followed by up to five `Caused by:` lines from the source chain.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        const MAX_DEPTH: usize = 5;
        let mut details = self.to_string();
        let mut source = self.source();
        let mut depth = 0;

        while let Some(cause) = source {
            if depth == MAX_DEPTH {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str("\n  Caused by: ");
            details.push_str(&cause.to_string());
            source = cause.source();
            depth += 1;
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        self.presentation().status
    }

    fn error_code(&self) -> &'static str {
        self.presentation().code
    }

    fn is_recoverable(&self) -> bool {
        self.presentation().recoverable
    }

    fn suggested_action(&self) -> Option<&'static str> {
        self.presentation().action
    }

    fn is_sensitive(&self) -> bool {
        self.presentation().sensitive
    }

    fn log_level(&self) -> LogLevel {
        self.presentation().level
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to save files".to_string(),
            AppError::UnknownTenant(_) => "Service not configured".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
            AppError::InvalidInput(msg) | AppError::BadRequest(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(AppError::InvalidInput("x".into()).http_status_code(), 400);
        assert_eq!(AppError::BadRequest("x".into()).http_status_code(), 400);
        assert_eq!(AppError::UnknownTenant("acme".into()).http_status_code(), 400);
        assert!(!AppError::InvalidInput("x".into()).is_recoverable());
    }

    #[test]
    fn each_variant_has_its_own_code() {
        #[cfg(feature = "sqlx")]
        let database = AppError::Database(SqlxError::PoolTimedOut);
        #[cfg(not(feature = "sqlx"))]
        let database = AppError::Database("locked".into());

        let errors = [
            database,
            AppError::Storage("x".into()),
            AppError::InvalidInput("x".into()),
            AppError::BadRequest("x".into()),
            AppError::UnknownTenant("x".into()),
            AppError::from(anyhow::anyhow!("x")),
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.error_code()).collect();
        assert_eq!(codes.len(), errors.len());
        for err in &errors {
            assert!(matches!(err.http_status_code(), 400 | 500), "{}", err.error_type());
        }
    }

    #[test]
    fn server_errors_are_sensitive() {
        let err = AppError::Storage("disk full at /var/tmp".into());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
        assert!(!err.client_message().contains("/var/tmp"));
    }

    #[test]
    fn unknown_tenant_does_not_echo_identifier() {
        let err = AppError::UnknownTenant("<script>".into());
        assert_eq!(err.client_message(), "Service not configured");
        assert_eq!(err.error_code(), "SERVICE_NOT_CONFIGURED");
    }

    #[test]
    fn validation_errors_become_missing_fields() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("fullName", validator::ValidationError::new("length"));
        let err = AppError::from(errors);
        assert_eq!(err.client_message(), "Missing required fields");
    }

    #[test]
    fn detailed_message_walks_source_chain() {
        let err = AppError::InternalWithSource {
            message: "outer".into(),
            source: anyhow::anyhow!("inner cause"),
        };
        assert!(err.detailed_message().contains("Caused by: inner cause"));
    }
}
