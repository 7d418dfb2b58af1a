use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::IntoResponse,
    Json,
};
use crate::state::AppState;
use std::sync::Arc;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

/// Issue a fresh token, returned both in the body and as the `csrf-token` cookie.
/// Clients echo it in `X-CSRF-Token` on every state-changing request.
#[utoipa::path(
    get,
    path = "/api/v1/csrf-token",
    tag = "security",
    responses(
        (status = 200, description = "Token issued", body = CsrfTokenResponse)
    )
)]
pub async fn get_csrf_token(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let csrf = &state.csrf;
    let token = csrf.issue_token();
    let cookie = csrf.cookie_for(&token);

    (
        [(SET_COOKIE, cookie)],
        Json(CsrfTokenResponse { csrf_token: token }),
    )
}
