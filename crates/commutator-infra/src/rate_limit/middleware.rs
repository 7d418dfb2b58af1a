use super::limiter::{HttpRateLimiter, RateLimitDecision};
use crate::error::ErrorResponse;
use crate::ip_extraction::client_ip;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

fn set_header(headers: &mut HeaderMap, name: &'static str, value: impl ToString) {
    if let Ok(header_value) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(name, header_value);
    }
}

/// HTTP rate limiting middleware, keyed by client IP.
///
/// Adds `X-RateLimit-Limit` and `X-RateLimit-Remaining` to responses; a rejected request
/// gets `429` with `Retry-After` in whole seconds.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<HttpRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = match client_ip(&request, rate_limiter.trusted_proxy_count()) {
        Some(ip) => format!("ip:{}", ip),
        None => "ip:unknown".to_string(),
    };
    let limit = rate_limiter.limit_per_minute();

    match rate_limiter.acquire(&key).await {
        RateLimitDecision::Allowed { remaining, .. } => {
            let mut response = next.run(request).await;
            set_header(response.headers_mut(), "X-RateLimit-Limit", limit);
            set_header(response.headers_mut(), "X-RateLimit-Remaining", remaining);
            response
        }
        RateLimitDecision::Rejected { retry_after } => {
            tracing::warn!(
                key = %key,
                path = %request.uri().path(),
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );

            let retry_secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
            let mut response = ErrorResponse::new(
                "Too many requests. Please slow down.",
                "RateLimitExceeded",
            )
            .into_response_with(StatusCode::TOO_MANY_REQUESTS);

            let headers = response.headers_mut();
            set_header(headers, "X-RateLimit-Limit", limit);
            set_header(headers, "X-RateLimit-Remaining", 0);
            set_header(headers, "Retry-After", retry_secs);
            response
        }
    }
}
