//! Source-IP allowlist.
//!
//! Rules are `*` (anyone), exact addresses, or CIDR blocks (`10.0.0.0/8`, `2001:db8::/32`).
//! An IPv4-mapped IPv6 client address is matched as IPv4.

use crate::error::ErrorResponse;
use crate::ip_extraction::client_ip;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllowlistError {
    #[error("invalid allowlist entry '{0}'")]
    InvalidEntry(String),

    #[error("invalid prefix length in '{0}'")]
    InvalidPrefix(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpRule {
    Any,
    Exact(IpAddr),
    Cidr { network: IpAddr, prefix: u8 },
}

impl IpRule {
    pub fn parse(entry: &str) -> Result<Self, AllowlistError> {
        let entry = entry.trim();
        if entry == "*" {
            return Ok(IpRule::Any);
        }

        let Some((addr, prefix)) = entry.split_once('/') else {
            return entry
                .parse()
                .map(|ip| IpRule::Exact(canonical(ip)))
                .map_err(|_| AllowlistError::InvalidEntry(entry.to_string()));
        };

        let network: IpAddr = addr
            .trim()
            .parse()
            .map_err(|_| AllowlistError::InvalidEntry(entry.to_string()))?;
        let prefix: u8 = prefix
            .trim()
            .parse()
            .map_err(|_| AllowlistError::InvalidPrefix(entry.to_string()))?;
        let max = if network.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(AllowlistError::InvalidPrefix(entry.to_string()));
        }

        Ok(IpRule::Cidr { network, prefix })
    }

    pub fn matches(&self, ip: IpAddr) -> bool {
        let ip = canonical(ip);
        match *self {
            IpRule::Any => true,
            IpRule::Exact(allowed) => allowed == ip,
            IpRule::Cidr { network, prefix } => match (network, ip) {
                (IpAddr::V4(net), IpAddr::V4(addr)) => {
                    let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
                    u32::from(net) & mask == u32::from(addr) & mask
                }
                (IpAddr::V6(net), IpAddr::V6(addr)) => {
                    let mask = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
                    u128::from(net) & mask == u128::from(addr) & mask
                }
                _ => false,
            },
        }
    }
}

fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    }
}

#[derive(Debug, Clone)]
pub struct IpAllowlist {
    rules: Arc<[IpRule]>,
    trusted_proxy_count: usize,
}

impl IpAllowlist {
    pub fn parse<S: AsRef<str>>(
        entries: &[S],
        trusted_proxy_count: usize,
    ) -> Result<Self, AllowlistError> {
        let rules = entries
            .iter()
            .map(|e| e.as_ref().trim())
            .filter(|e| !e.is_empty())
            .map(IpRule::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules: rules.into(),
            trusted_proxy_count,
        })
    }

    pub fn allows(&self, ip: IpAddr) -> bool {
        self.rules.iter().any(|rule| rule.matches(ip))
    }

    pub fn allows_everyone(&self) -> bool {
        self.rules.contains(&IpRule::Any)
    }
}

/// Rejects requests whose client IP matches no rule (or cannot be determined) with 403.
pub async fn ip_allowlist_middleware(
    State(allowlist): State<IpAllowlist>,
    request: Request,
    next: Next,
) -> Response {
    if allowlist.allows_everyone() {
        return next.run(request).await;
    }

    match client_ip(&request, allowlist.trusted_proxy_count) {
        Some(ip) if allowlist.allows(ip) => next.run(request).await,
        ip => {
            tracing::warn!(
                client_ip = ?ip,
                path = %request.uri().path(),
                "Request rejected by IP allowlist"
            );
            ErrorResponse::new("Forbidden", "Forbidden").into_response_with(StatusCode::FORBIDDEN)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn parses_rules() {
        assert_eq!(IpRule::parse("*").unwrap(), IpRule::Any);
        assert_eq!(IpRule::parse(" 10.1.2.3 ").unwrap(), IpRule::Exact(ip("10.1.2.3")));
        assert_eq!(
            IpRule::parse("10.0.0.0/8").unwrap(),
            IpRule::Cidr {
                network: ip("10.0.0.0"),
                prefix: 8
            }
        );
        assert!(matches!(IpRule::parse("10.0.0.0/33"), Err(AllowlistError::InvalidPrefix(_))));
        assert!(matches!(IpRule::parse("nope"), Err(AllowlistError::InvalidEntry(_))));
        assert!(matches!(IpRule::parse("10.0.0.0/x"), Err(AllowlistError::InvalidPrefix(_))));
    }

    #[test]
    fn cidr_matching() {
        let rule = IpRule::parse("192.168.0.0/16").unwrap();
        assert!(rule.matches(ip("192.168.44.1")));
        assert!(!rule.matches(ip("192.169.0.1")));
        assert!(rule.matches(ip("::ffff:192.168.1.1")));

        let v6 = IpRule::parse("2001:db8::/32").unwrap();
        assert!(v6.matches(ip("2001:db8:1::5")));
        assert!(!v6.matches(ip("2001:db9::1")));
        assert!(!v6.matches(ip("192.168.0.1")));

        assert!(IpRule::parse("0.0.0.0/0").unwrap().matches(ip("8.8.8.8")));
        assert!(IpRule::parse("8.8.8.8/32").unwrap().matches(ip("8.8.8.8")));
    }

    #[test]
    fn list_parsing_skips_blanks() {
        let list = IpAllowlist::parse(&["10.0.0.1", " ", "172.16.0.0/12"], 1).unwrap();
        assert!(list.allows(ip("10.0.0.1")));
        assert!(list.allows(ip("172.20.1.1")));
        assert!(!list.allows(ip("10.0.0.2")));
        assert!(!list.allows_everyone());

        assert!(IpAllowlist::parse(&["10.0.0.1", "bogus"], 1).is_err());
    }

    async fn status_for(allowlist: IpAllowlist, forwarded: Option<&str>) -> StatusCode {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(allowlist, ip_allowlist_middleware));
        let mut request = Request::builder().uri("/");
        if let Some(value) = forwarded {
            request = request.header("X-Forwarded-For", value);
        }
        app.oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn middleware_enforces_rules() {
        let list = IpAllowlist::parse(&["203.0.113.0/24"], 1).unwrap();

        assert_eq!(
            status_for(list.clone(), Some("203.0.113.9, 10.0.0.1")).await,
            StatusCode::OK
        );
        assert_eq!(
            status_for(list.clone(), Some("198.51.100.1, 10.0.0.1")).await,
            StatusCode::FORBIDDEN
        );
        // A lone entry did not pass through the trusted proxy.
        assert_eq!(
            status_for(list.clone(), Some("203.0.113.9")).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_for(list, None).await, StatusCode::FORBIDDEN);

        let open = IpAllowlist::parse(&["*"], 1).unwrap();
        assert_eq!(status_for(open, None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn forwarded_headers_ignored_without_trusted_proxies() {
        let list = IpAllowlist::parse(&["203.0.113.0/24"], 0).unwrap();
        assert_eq!(
            status_for(list, Some("203.0.113.9, 10.0.0.1")).await,
            StatusCode::FORBIDDEN
        );
    }
}
