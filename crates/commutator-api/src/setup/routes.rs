//! Route configuration and middleware stack.

use crate::api_doc;
use crate::constants::{API_BASE, API_PREFIX, JSON_OVERHEAD_BYTES, MAX_PDFS_PER_ORDER};
use crate::handlers;
use crate::state::AppState;
use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use commutator_core::Config;
use commutator_infra::{
    csrf_middleware, ip_allowlist_middleware, rate_limit_middleware, request_id_middleware,
    security_headers_middleware, HttpRateLimiter, IpAllowlist, SecurityHeadersConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Largest accepted body: every PDF at full size, base64-inflated, plus the JSON around it.
pub fn body_limit(config: &Config) -> usize {
    let per_pdf = config.max_file_size_bytes().div_ceil(3) * 4;
    per_pdf * MAX_PDFS_PER_ORDER + JSON_OVERHEAD_BYTES
}

/// Setup all application routes
///
/// Outermost first: panic recovery, tracing, request id, security headers, body limit;
/// then on `/api/v1` only: CSRF, IP allowlist (when configured), per-IP rate limit.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let api = api_routes();

    let rate_limiter = setup_rate_limiter(config);
    rate_limiter
        .clone()
        .spawn_cleanup(RATE_LIMIT_CLEANUP_INTERVAL, state.background.child_token());
    let api = api.layer(from_fn_with_state(rate_limiter, rate_limit_middleware));

    let api = match config.allowed_ips() {
        Some(entries) => {
            let allowlist = IpAllowlist::parse(entries, config.trusted_proxy_count())
                .context("Invalid ALLOWED_IPS")?;
            tracing::info!(rules = entries.len(), "IP allowlist enabled");
            api.layer(from_fn_with_state(allowlist, ip_allowlist_middleware))
        }
        None => {
            tracing::info!("IP allowlist disabled (ALLOWED_IPS not set)");
            api
        }
    };

    let api = api.layer(from_fn_with_state(state.csrf.clone(), csrf_middleware));

    let body_limit = body_limit(config);
    tracing::info!(body_limit_bytes = body_limit, "Request body limit set");

    let security_headers = SecurityHeadersConfig {
        hsts: config.is_production(),
    };

    let app = Router::new()
        .nest(API_PREFIX, api)
        .route(
            &format!("{}/openapi.json", API_BASE),
            get(api_doc::openapi_json),
        )
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(from_fn_with_state(
            security_headers,
            security_headers_middleware,
        ))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state);

    Ok(app)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/order", post(handlers::order::submit_order))
        .route(
            "/cookie-consent",
            post(handlers::consent::log_cookie_consent),
        )
        .route("/health", get(handlers::health::health_check))
        .route("/csrf-token", get(handlers::csrf::get_csrf_token))
}

fn setup_rate_limiter(config: &Config) -> Arc<HttpRateLimiter> {
    let limiter = HttpRateLimiter::new(
        config.http_rate_limit_per_minute(),
        config.http_rate_limit_burst(),
        config.http_rate_limit_max_wait(),
        config.trusted_proxy_count(),
    );
    tracing::info!(
        per_minute = limiter.limit_per_minute(),
        burst = limiter.burst(),
        max_wait_secs = config.http_rate_limit_max_wait().as_secs(),
        "HTTP rate limiter enabled"
    );
    Arc::new(limiter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_fits_four_base64_pdfs() {
        let config = Config::from_lookup(|key| match key {
            "CSRF_KEY" => Some("k".repeat(32)),
            "DB_PATH" => Some("/tmp/commutator-test.db".to_string()),
            "MAX_FILE_SIZE_MB" => Some("3".to_string()),
            _ => None,
        })
        .unwrap();

        let limit = body_limit(&config);
        let raw = 3 * 1024 * 1024;
        assert!(limit >= 4 * raw * 4 / 3);
        assert!(limit < 4 * raw * 2);
    }
}
