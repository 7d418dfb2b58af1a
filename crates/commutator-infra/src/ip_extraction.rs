//! Client IP extraction behind reverse proxies.
//!
//! `X-Forwarded-For` is `client, proxy1, proxy2, ...`; with N trusted proxies the
//! client is the entry just before the last N. Without trusted proxies only the
//! connection address is used. Values that are not IP addresses are
//! discarded so a spoofed header cannot inject arbitrary keys.

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Resolve the client IP, or `None` when nothing trustworthy is available.
///
/// With no trusted proxies the headers are ignored and only the socket address counts.
/// `X-Real-IP` is believed only behind trusted proxies, and only when `X-Forwarded-For`
/// does not yield an address.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> Option<IpAddr> {
    let socket_ip = socket_addr.map(SocketAddr::ip);
    if trusted_proxy_count == 0 {
        return socket_ip;
    }

    if let Some(forwarded_for) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        // A header that is present but too short or malformed was not written by our
        // proxies; X-Real-IP from the same client is no better.
        return from_forwarded_for(forwarded_for, trusted_proxy_count).or(socket_ip);
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
        .or(socket_ip)
}

/// Client IP of an axum request, using the connection address as last resort.
pub fn client_ip(request: &Request, trusted_proxy_count: usize) -> Option<IpAddr> {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    extract_client_ip(request.headers(), socket_addr.as_ref(), trusted_proxy_count)
}

/// Entry just before the last `trusted_proxy_count` hops; `None` when the chain is
/// shorter than that.
fn from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<IpAddr> {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let index = ips.len().checked_sub(trusted_proxy_count + 1)?;
    ips[index].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn xff(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(value).unwrap());
        headers
    }

    fn ip(s: &str) -> Option<IpAddr> {
        Some(s.parse().unwrap())
    }

    fn socket() -> SocketAddr {
        SocketAddr::from(([198, 51, 100, 7], 40000))
    }

    #[test]
    fn skips_trusted_proxies() {
        assert_eq!(from_forwarded_for("192.168.1.1, 10.0.0.1", 1), ip("192.168.1.1"));
        assert_eq!(
            from_forwarded_for("192.168.1.1, 10.0.0.1, 10.0.0.2", 2),
            ip("192.168.1.1")
        );
        assert_eq!(
            from_forwarded_for("6.6.6.6, 192.168.1.1, 10.0.0.1", 1),
            ip("192.168.1.1")
        );
    }

    #[test]
    fn short_chain_is_not_believed() {
        assert_eq!(from_forwarded_for("192.168.1.1", 1), None);
        assert_eq!(from_forwarded_for("192.168.1.1, 10.0.0.1", 2), None);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(from_forwarded_for("not.an.ip.address, 10.0.0.1", 1), None);
        assert_eq!(from_forwarded_for(" , ", 1), None);
    }

    #[test]
    fn headers_ignored_without_trusted_proxies() {
        let mut headers = xff("5.6.7.8, 9.9.9.9");
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.4"));

        assert_eq!(extract_client_ip(&headers, Some(&socket()), 0), ip("198.51.100.7"));
        assert_eq!(extract_client_ip(&headers, None, 0), None);
    }

    #[test]
    fn direct_client_cannot_forge_forwarded_for() {
        // One trusted proxy expects `client, proxy`; a lone entry came from the client.
        assert_eq!(
            extract_client_ip(&xff("5.6.7.8"), Some(&socket()), 1),
            ip("198.51.100.7")
        );

        let mut headers = xff("5.6.7.8");
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.4"));
        assert_eq!(extract_client_ip(&headers, Some(&socket()), 1), ip("198.51.100.7"));
    }

    #[test]
    fn real_ip_used_behind_trusted_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("2001:db8::1"));
        assert_eq!(extract_client_ip(&headers, Some(&socket()), 1), ip("2001:db8::1"));

        assert_eq!(extract_client_ip(&HeaderMap::new(), Some(&socket()), 1), ip("198.51.100.7"));
        assert_eq!(extract_client_ip(&HeaderMap::new(), None, 1), None);
    }

    #[test]
    fn forwarded_for_wins_over_socket() {
        let proxy = SocketAddr::from(([10, 0, 0, 9], 443));
        assert_eq!(
            extract_client_ip(&xff("203.0.113.5, 10.0.0.9"), Some(&proxy), 1),
            ip("203.0.113.5")
        );
    }
}
