//! Commutator Infrastructure Library
//!
//! Shared infrastructure used by the HTTP service:
//! - Middleware (request ID, security headers, CSRF, IP allowlist)
//! - Per-IP rate limiting
//! - Client IP extraction behind proxies
//! - Telemetry initialization
//! - Periodic temp directory cleanup

pub mod cleanup;
pub mod error;
pub mod ip_extraction;
pub mod middleware;
pub mod rate_limit;
pub mod telemetry;

// Re-export commonly used types
pub use cleanup::TempSweepService;
pub use error::ErrorResponse;
pub use ip_extraction::{client_ip, extract_client_ip};
pub use middleware::{
    csrf_cookie, csrf_middleware, generate_csrf_token, ip_allowlist_middleware,
    request_id_middleware, security_headers_middleware, CsrfConfig, IpAllowlist, RequestId,
    SecurityHeadersConfig,
};
pub use rate_limit::{rate_limit_middleware, HttpRateLimiter, RateLimitDecision};
pub use telemetry::init_telemetry;
