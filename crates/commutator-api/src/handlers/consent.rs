use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::extractors::RequestMeta;
use crate::state::DbState;
use axum::{extract::State, response::IntoResponse, Json};
use commutator_core::models::NewConsentRecord;
use commutator_core::{AppError, CookieConsentRequest};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct ConsentResponse {
    /// Always `"logged"`
    pub status: String,
    pub service: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/cookie-consent",
    tag = "consent",
    request_body = CookieConsentRequest,
    responses(
        (status = 200, description = "Consent recorded", body = ConsentResponse),
        (status = 400, description = "Invalid payload or missing fields", body = ErrorResponse),
        (status = 500, description = "Audit write failed", body = ErrorResponse)
    )
)]
pub async fn log_cookie_consent(
    State(db): State<DbState>,
    meta: RequestMeta,
    ValidatedJson(consent): ValidatedJson<CookieConsentRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if let Err(errors) = consent.validate() {
        tracing::debug!(errors = %errors, "Consent failed field validation");
        return Err(AppError::InvalidInput("Missing required fields".to_string()).into());
    }

    let mut record = NewConsentRecord::from(&consent);
    // The browser-reported values win; the connection fills the gaps.
    if record.ip_address.trim().is_empty() {
        record.ip_address = meta.client_ip.map(|ip| ip.to_string()).unwrap_or_default();
    }
    if record.user_agent.trim().is_empty() {
        record.user_agent = meta.user_agent;
    }

    let id = db.consents.insert(&record).await.map_err(|e| {
        tracing::error!(service = %consent.service_name, error = %e, "Failed to log consent");
        e
    })?;

    tracing::info!(
        consent_id = id,
        service = %consent.service_name,
        accepted = consent.accepted,
        "Cookie consent logged"
    );

    Ok(Json(ConsentResponse {
        status: "logged".to_string(),
        service: consent.service_name,
    }))
}
