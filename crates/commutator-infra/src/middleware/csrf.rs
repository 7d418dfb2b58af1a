//! CSRF protection using the double-submit cookie pattern.
//!
//! Tokens are stateless: `<hmac>.<timestamp>.<nonce>`, where the HMAC-SHA256 covers
//! `<timestamp>.<nonce>` under the server secret. A state-changing request must carry
//! the same valid token in the `X-CSRF-Token` header and the `csrf-token` cookie.

use crate::error::ErrorResponse;
use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const CSRF_HEADER_NAME: &str = "X-CSRF-Token";
pub const CSRF_COOKIE_NAME: &str = "csrf-token";

/// CSRF token expiration time (1 hour)
const CSRF_TOKEN_EXPIRATION_SECS: u64 = 3600;

#[derive(Clone)]
pub struct CsrfConfig {
    secret: Arc<str>,
    /// Add `Secure` to the cookie (production, HTTPS only)
    pub secure_cookie: bool,
}

impl CsrfConfig {
    pub fn new(secret: impl Into<Arc<str>>, secure_cookie: bool) -> Self {
        Self {
            secret: secret.into(),
            secure_cookie,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn issue_token(&self) -> String {
        generate_csrf_token(&self.secret)
    }

    pub fn cookie_for(&self, token: &str) -> String {
        csrf_cookie(token, self.secure_cookie)
    }
}

impl std::fmt::Debug for CsrfConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfConfig")
            .field("secret", &"<redacted>")
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn sign(secret: &str, message: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(message.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

fn token_at(secret: &str, timestamp: u64, nonce: &str) -> String {
    let message = format!("{}.{}", timestamp, nonce);
    // HMAC accepts keys of any length, so signing cannot fail.
    let hmac = sign(secret, &message).unwrap_or_default();
    format!("{}.{}", hmac, message)
}

/// Generate a CSRF token
pub fn generate_csrf_token(secret: &str) -> String {
    token_at(secret, unix_now(), &Uuid::new_v4().to_string())
}

/// Check format, signature (constant time) and age of a token.
pub fn verify_csrf_token(token: &str, secret: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    let [hmac_part, timestamp_str, nonce] = parts.as_slice() else {
        return false;
    };

    let Ok(timestamp) = timestamp_str.parse::<u64>() else {
        return false;
    };

    if timestamp.saturating_add(CSRF_TOKEN_EXPIRATION_SECS) < unix_now() {
        tracing::debug!("CSRF token expired");
        return false;
    }

    let Some(expected) = sign(secret, &format!("{}.{}", timestamp, nonce)) else {
        return false;
    };
    expected.as_bytes().ct_eq(hmac_part.as_bytes()).into()
}

/// `Set-Cookie` value carrying the token.
pub fn csrf_cookie(token: &str, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; SameSite=Strict; HttpOnly{}",
        CSRF_COOKIE_NAME, token, secure_flag
    )
}

fn cookie_token(request: &Request) -> Option<String> {
    let prefix = format!("{}=", CSRF_COOKIE_NAME);
    request
        .headers()
        .get_all("Cookie")
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .map(str::trim)
        .find_map(|part| part.strip_prefix(prefix.as_str()))
        .map(|s| s.trim().to_string())
}

/// Rejects state-changing requests without a matching, valid header/cookie token pair.
/// GET, HEAD and OPTIONS pass through.
pub async fn csrf_middleware(
    State(config): State<CsrfConfig>,
    request: Request,
    next: Next,
) -> Response {
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return next.run(request).await;
    }

    let header_token = request
        .headers()
        .get(CSRF_HEADER_NAME)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string());

    let is_valid = match (header_token, cookie_token(&request)) {
        (Some(header), Some(cookie)) => {
            bool::from(header.as_bytes().ct_eq(cookie.as_bytes()))
                && verify_csrf_token(&header, config.secret())
        }
        _ => false,
    };

    if !is_valid {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "CSRF validation failed"
        );
        return ErrorResponse::new("CSRF token validation failed", "CsrfValidationError")
            .with_details(
                "Missing or invalid CSRF token. Include X-CSRF-Token header matching the csrf-token cookie.",
            )
            .into_response_with(StatusCode::FORBIDDEN);
    }

    next.run(request).await
}
