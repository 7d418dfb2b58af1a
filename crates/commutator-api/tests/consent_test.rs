//! Cookie-consent integration tests.
//!
//! Run with: `cargo test -p commutator-api --test consent_test`

mod helpers;

use helpers::csrf::post_json;
use helpers::fixtures::consent_body;
use helpers::setup_test_app;
use serde_json::Value;

#[tokio::test]
async fn test_consent_is_logged() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = post_json(client, "/cookie-consent", &consent_body())
        .await
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "logged");
    assert_eq!(body["service"], "Acme");

    let rows = app
        .state
        .db
        .consents
        .find_by_fingerprint("fp-7f3a")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].accepted);
    assert_eq!(rows[0].ip_address, "198.51.100.4");
}

#[tokio::test]
async fn test_consent_missing_fields() {
    let app = setup_test_app().await;
    let client = app.client();

    let mut consent = consent_body();
    consent["fingerprint"] = Value::String(String::new());

    let response = post_json(client, "/cookie-consent", &consent)
        .await
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "Missing required fields");
    assert_eq!(app.consent_count().await, 0);
}

#[tokio::test]
async fn test_consent_fills_user_agent_from_request() {
    let app = setup_test_app().await;
    let client = app.client();

    let mut consent = consent_body();
    consent["userAgent"] = Value::String(String::new());

    let response = post_json(client, "/cookie-consent", &consent)
        .await
        .add_header("User-Agent", "integration-agent/1.0")
        .await;

    assert_eq!(response.status_code(), 200);
    let rows = app
        .state
        .db
        .consents
        .find_by_fingerprint("fp-7f3a")
        .await
        .unwrap();
    assert_eq!(rows[0].user_agent, "integration-agent/1.0");
}
