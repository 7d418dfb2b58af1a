//! Per-client HTTP rate limiting.

mod limiter;
mod middleware;

pub use limiter::{HttpRateLimiter, RateLimitDecision};
pub use middleware::rate_limit_middleware;
