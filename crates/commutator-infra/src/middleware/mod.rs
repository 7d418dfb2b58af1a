//! Shared HTTP middleware

pub mod csrf;
pub mod ip_allowlist;
pub mod request_id;
pub mod security_headers;

pub use csrf::{
    csrf_cookie, csrf_middleware, generate_csrf_token, verify_csrf_token, CsrfConfig,
    CSRF_COOKIE_NAME, CSRF_HEADER_NAME,
};
pub use ip_allowlist::{ip_allowlist_middleware, AllowlistError, IpAllowlist, IpRule};
pub use request_id::{request_id_middleware, RequestId};
pub use security_headers::{security_headers_middleware, SecurityHeadersConfig};
