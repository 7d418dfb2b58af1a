//! Request metadata extractors.

use crate::constants::SERVICE_NAME_HEADER;
use crate::state::AppState;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{ACCEPT_LANGUAGE, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use commutator_infra::extract_client_ip;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Caller details recorded next to an order.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Trimmed `X-Service-Name`, `None` when absent or blank
    pub service_name: Option<String>,
    pub accept_language: Option<String>,
    pub client_ip: Option<IpAddr>,
    pub user_agent: String,
}

fn header_str(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl FromRequestParts<Arc<AppState>> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let socket_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self {
            service_name: header_str(&parts.headers, SERVICE_NAME_HEADER),
            accept_language: header_str(&parts.headers, ACCEPT_LANGUAGE),
            client_ip: extract_client_ip(
                &parts.headers,
                socket_addr.as_ref(),
                state.config.trusted_proxy_count(),
            ),
            user_agent: header_str(&parts.headers, USER_AGENT).unwrap_or_default(),
        })
    }
}
