//! Header manipulation for forwarded traffic.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Add X-Forwarded-For, X-Forwarded-Host, X-Forwarded-Proto
//! - Point the Host header at the upstream
//!
//! # Design Decisions
//! - X-Forwarded-For is appended to, never replaced
//! - Headers named in `Connection` are hop-by-hop as well

use std::net::IpAddr;

use axum::http::header::{CONNECTION, HOST};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Rewrite request headers for the upstream hop.
///
/// `inbound_authority` is the request URI's authority, which carries the
/// original host on HTTP/2 where no Host header is sent. Returns `false` if
/// `upstream_authority` is not a valid Host value.
pub fn prepare_upstream_headers(
    headers: &mut HeaderMap,
    client_ip: Option<IpAddr>,
    inbound_authority: Option<&str>,
    upstream_authority: &str,
) -> bool {
    let Ok(upstream_host) = HeaderValue::from_str(upstream_authority) else {
        return false;
    };

    strip_hop_by_hop(headers);

    let original_host = headers.get(HOST).cloned().or_else(|| {
        inbound_authority.and_then(|authority| HeaderValue::from_str(authority).ok())
    });
    if let Some(original_host) = original_host {
        headers.insert(X_FORWARDED_HOST, original_host);
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));

    if let Some(ip) = client_ip {
        let forwarded = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) if !prior.trim().is_empty() => format!("{prior}, {ip}"),
            _ => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    headers.insert(HOST, upstream_host);
    true
}
