//! Forwarding a matched request to its upstream.
//!
//! # Responsibilities
//! - Strip the matched prefix from the request path, exactly once
//! - Match on the percent-decoded path while forwarding the remainder
//!   encoded exactly as the client sent it
//! - Build the outbound URI and headers from the service's upstream
//! - Send through the shared client and stream the response back
//!
//! # Design Decisions
//! - Outbound requests are always HTTP/1.1; the client speaks h1 to upstreams
//! - Address failures and upstream round-trip failures both answer 502

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode, Version},
    response::{IntoResponse, Response},
};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use percent_encoding::percent_decode_str;

use crate::http::headers::{prepare_upstream_headers, strip_hop_by_hop};
use crate::http::request::request_id;
use crate::registry::Upstream;

pub type HttpClient = Client<HttpConnector, Body>;

/// Percent-decoded form of a request path, used for prefix matching.
pub fn decode_path(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8_lossy()
}

/// Remove `prefix` (compared ASCII case-insensitively against the decoded
/// path) from the front of the encoded `path`, ignoring leading slashes.
/// The result always starts with `/`.
pub fn strip_prefix(path: &str, prefix: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    let rest = encoded_prefix_len(trimmed, prefix)
        .and_then(|len| trimmed.get(len..))
        .unwrap_or(trimmed);
    if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{rest}")
    }
}

/// Byte length of the leading part of `raw` that decodes to `prefix`.
fn encoded_prefix_len(raw: &str, prefix: &str) -> Option<usize> {
    let raw = raw.as_bytes();
    let mut pos = 0;
    for expected in prefix.bytes() {
        let (byte, width) = match *raw.get(pos)? {
            b'%' => match (raw.get(pos + 1).and_then(hex), raw.get(pos + 2).and_then(hex)) {
                (Some(hi), Some(lo)) => ((hi << 4) | lo, 3),
                _ => (b'%', 1),
            },
            b => (b, 1),
        };
        if !byte.eq_ignore_ascii_case(&expected) {
            return None;
        }
        pos += width;
    }
    Some(pos)
}

fn hex(digit: &u8) -> Option<u8> {
    char::from(*digit).to_digit(16).map(|d| d as u8)
}

/// Forward `request`, matched under `prefix`, to `upstream`.
pub async fn forward(
    client: &HttpClient,
    prefix: &str,
    upstream: &Upstream,
    request: Request<Body>,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();

    let path = strip_prefix(parts.uri.path(), prefix);
    let target = match upstream.target_uri(&path, parts.uri.query()) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                address = %upstream.url(),
                error = %e,
                "Cannot build upstream address"
            );
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let client_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let inbound_authority = parts.uri.authority().map(|a| a.as_str().to_string());
    if !prepare_upstream_headers(
        &mut parts.headers,
        client_ip,
        inbound_authority.as_deref(),
        &upstream.authority(),
    ) {
        tracing::warn!(
            request_id = %request_id,
            address = %upstream.url(),
            "Upstream authority is not a valid Host header"
        );
        return StatusCode::BAD_GATEWAY.into_response();
    }

    tracing::debug!(request_id = %request_id, target = %target, "Forwarding request");

    parts.uri = target;
    parts.version = Version::HTTP_11;
    let outbound = Request::from_parts(parts, body);

    match client.request(outbound).await {
        Ok(response) => {
            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                address = %upstream.url(),
                error = %e,
                "Upstream request failed"
            );
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
