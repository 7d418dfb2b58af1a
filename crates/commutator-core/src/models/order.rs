use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Binary field as sent by clients: a base64 string or a raw byte array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum PdfPayload {
    Base64(String),
    Bytes(Vec<u8>),
}

impl Default for PdfPayload {
    fn default() -> Self {
        PdfPayload::Bytes(Vec::new())
    }
}

impl PdfPayload {
    /// Decode into raw bytes. Base64 accepts the standard alphabet with padding.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self {
            PdfPayload::Base64(encoded) => {
                base64::engine::general_purpose::STANDARD.decode(encoded.trim())
            }
            PdfPayload::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PdfPayload::Base64(encoded) => encoded.trim().is_empty(),
            PdfPayload::Bytes(bytes) => bytes.is_empty(),
        }
    }
}

/// `POST /order` request body
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "fullName is required"))]
    pub full_name: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "contactInfo is required"))]
    pub contact_info: String,
    #[serde(default)]
    pub project_link: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "paymentMethod is required"))]
    pub payment_method: String,
    #[serde(default)]
    pub start_date: String,
    /// Language code, e.g. "en"
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub brief_file: Option<PdfPayload>,
    #[serde(default)]
    pub specification_pdf: PdfPayload,
    #[serde(default)]
    pub invoice_pdf: PdfPayload,
    #[serde(default)]
    pub contract_pdf: PdfPayload,
}

/// `POST /cookie-consent` request body
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CookieConsentRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "serviceName is required"))]
    pub service_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "fingerprint is required"))]
    pub fingerprint: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    #[validate(length(min = 1, message = "timestamp is required"))]
    pub timestamp: String,
    #[serde(default)]
    pub language: String,
}

/// Audit row for an accepted order
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderRecord {
    pub id: i64,
    pub service_name: String,
    pub full_name: String,
    pub company_name: String,
    pub country: String,
    pub address: String,
    pub contact_info: String,
    pub project_link: String,
    pub payment_method: String,
    pub start_date: String,
    pub language: String,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

/// Values written for a new order audit row
#[derive(Debug, Clone)]
pub struct NewOrderRecord {
    pub service_name: String,
    pub full_name: String,
    pub company_name: String,
    pub country: String,
    pub address: String,
    pub contact_info: String,
    pub project_link: String,
    pub payment_method: String,
    pub start_date: String,
    /// Negotiated language, not the raw request value
    pub language: String,
    pub ip_address: String,
    pub user_agent: String,
}

/// Audit row for a cookie-consent event
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ConsentRecord {
    pub id: i64,
    pub service_name: String,
    pub fingerprint: String,
    pub user_agent: String,
    pub ip_address: String,
    pub accepted: bool,
    pub timestamp: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

impl From<&CookieConsentRequest> for NewConsentRecord {
    fn from(req: &CookieConsentRequest) -> Self {
        Self {
            service_name: req.service_name.clone(),
            fingerprint: req.fingerprint.clone(),
            user_agent: req.user_agent.clone(),
            ip_address: req.ip_address.clone(),
            accepted: req.accepted,
            timestamp: req.timestamp.clone(),
            language: req.language.clone(),
        }
    }
}

/// Values written for a new consent audit row
#[derive(Debug, Clone)]
pub struct NewConsentRecord {
    pub service_name: String,
    pub fingerprint: String,
    pub user_agent: String,
    pub ip_address: String,
    pub accepted: bool,
    pub timestamp: String,
    pub language: String,
}
