use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::extractors::RequestMeta;
use crate::services::intake::{OrderIntake, OrderSubmission};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use commutator_core::OrderRequest;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    /// Always `"success"`
    pub status: String,
    pub service: String,
    /// Language the confirmation was rendered in
    pub lang: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/order",
    tag = "orders",
    request_body = OrderRequest,
    params(
        ("X-Service-Name" = String, Header, description = "Tenant service the order is for")
    ),
    responses(
        (status = 200, description = "Order accepted and dispatched", body = OrderResponse),
        (status = 400, description = "Invalid payload, PDF, or service", body = ErrorResponse),
        (status = 403, description = "CSRF or IP allowlist rejection", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "File or audit persistence failed", body = ErrorResponse)
    )
)]
pub async fn submit_order(
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    ValidatedJson(order): ValidatedJson<OrderRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let submission = OrderSubmission {
        order,
        service_name: meta.service_name,
        accept_language: meta.accept_language,
        client_ip: meta.client_ip,
        user_agent: meta.user_agent,
    };

    let receipt = OrderIntake::from_state(&state).process(submission).await?;

    Ok(Json(OrderResponse {
        status: "success".to_string(),
        service: receipt.service,
        lang: receipt.language,
    }))
}
