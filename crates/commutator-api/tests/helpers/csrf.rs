//! Double-submit CSRF token handling for state-changing requests.

use axum_test::{TestRequest, TestServer};

use super::api_path;

pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Fetch a fresh token from the token endpoint.
pub async fn fetch_token(client: &TestServer) -> String {
    let response = client.get(&api_path("/csrf-token")).await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    body["csrfToken"]
        .as_str()
        .expect("csrfToken in body")
        .to_string()
}

/// Attach the token as both header and cookie.
pub fn with_token(request: TestRequest, token: &str) -> TestRequest {
    request
        .add_header(CSRF_HEADER, token.to_string())
        .add_header("Cookie", format!("csrf-token={}", token))
}

/// POST `body` as JSON to `path` with a valid CSRF pair.
pub async fn post_json(
    client: &TestServer,
    path: &str,
    body: &serde_json::Value,
) -> TestRequest {
    let token = fetch_token(client).await;
    with_token(client.post(&api_path(path)).json(body), &token)
}
