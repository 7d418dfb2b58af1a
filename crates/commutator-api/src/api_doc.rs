//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use commutator_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(get_openapi_spec())
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Commutator API",
        version = "0.1.0",
        description = "Multi-tenant order intake. Orders carrying PDF documents are validated, \
            delivered by email and chat-bot notification per tenant service, and audit-logged. \
            All endpoints are versioned under /api/v1/."
    ),
    paths(
        handlers::order::submit_order,
        handlers::consent::log_cookie_consent,
        handlers::health::health_check,
        handlers::csrf::get_csrf_token,
    ),
    components(schemas(
        models::OrderRequest,
        models::CookieConsentRequest,
        models::PdfPayload,
        handlers::order::OrderResponse,
        handlers::consent::ConsentResponse,
        handlers::health::HealthResponse,
        handlers::csrf::CsrfTokenResponse,
        error::ErrorResponse,
    )),
    tags(
        (name = "orders", description = "Order submission and delivery"),
        (name = "consent", description = "Cookie-consent audit log"),
        (name = "health", description = "Liveness"),
        (name = "security", description = "CSRF token issuance")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let spec = get_openapi_spec();
        for path in [
            "/api/v1/order",
            "/api/v1/cookie-consent",
            "/api/v1/health",
            "/api/v1/csrf-token",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
