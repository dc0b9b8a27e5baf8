//! Upstream service records.
//!
//! # Responsibilities
//! - Represent one registered upstream and its availability status
//! - Pre-parse the upstream address once, at registration time
//! - Build outbound URIs for the dispatcher
//!
//! # Design Decisions
//! - Status and upstream target live in one immutable `ServiceState` that is
//!   swapped atomically, so readers never observe a torn update
//! - `path` and `health_check_url` are fixed for the life of a record;
//!   re-registration replaces the whole record

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::Uri;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::RegistryError;

/// Availability of a registered service.
///
/// ```text
/// CHECKING ──probe ok──▶ UP ◀──probe ok── DOWN
///     │                   │                 ▲
///     └────probe fail─────┴───probe fail────┘
///
/// any ──pause──▶ PAUSE ──resume──▶ CHECKING
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceStatus {
    Up,
    Down,
    Pause,
    #[default]
    Checking,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Up => "UP",
            ServiceStatus::Down => "DOWN",
            ServiceStatus::Pause => "PAUSE",
            ServiceStatus::Checking => "CHECKING",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized form of a service, used for discovery bodies and snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceRecord {
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub status: ServiceStatus,

    #[serde(rename = "healthCheckURL", default)]
    pub health_check_url: String,
}

/// Registry key for a service path: slashes trimmed, ASCII lower-cased.
///
/// ASCII-only lowering keeps byte offsets identical between the key and the
/// request path, which the dispatcher relies on when stripping the prefix.
pub fn normalize_prefix(path: &str) -> String {
    path.trim_matches('/').to_ascii_lowercase()
}

/// First non-empty segment of `hint`, lower-cased.
pub fn resolve_hint(hint: &str) -> Option<String> {
    hint.split('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.to_ascii_lowercase())
}

/// A parsed upstream base address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    url: Url,
}

impl Upstream {
    /// Parse an absolute `http` address with a host.
    ///
    /// TLS to upstreams is not supported, so `https` is rejected up front
    /// rather than failing on every forwarded request.
    pub fn parse(address: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidUpstream {
            address: address.to_string(),
            reason,
        };

        let url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" => {}
            other => return Err(invalid(format!("unsupported scheme {other:?}"))),
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// `host[:port]` as written in the address, used for the outbound Host.
    pub fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// `host:port` with the scheme's default port filled in.
    pub fn socket_target(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        let port = self.url.port_or_known_default().unwrap_or(80);
        format!("{host}:{port}")
    }

    /// Build the outbound URI for a request path and query.
    ///
    /// The upstream's own base path is joined with `path` using exactly one
    /// slash, and both query strings are kept.
    pub fn target_uri(&self, path: &str, query: Option<&str>) -> Result<Uri, RegistryError> {
        let joined = join_paths(self.url.path(), path);
        let query = match (self.url.query(), query) {
            (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => Some(format!("{a}&{b}")),
            (Some(a), _) if !a.is_empty() => Some(a.to_string()),
            (_, Some(b)) if !b.is_empty() => Some(b.to_string()),
            _ => None,
        };

        let mut target = format!("{}://{}{}", self.scheme(), self.authority(), joined);
        if let Some(q) = query {
            target.push('?');
            target.push_str(&q);
        }

        target
            .parse::<Uri>()
            .map_err(|e| RegistryError::InvalidUpstream {
                address: target.clone(),
                reason: e.to_string(),
            })
    }
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// Mutable part of a service, replaced as a whole on every update.
#[derive(Debug, Clone)]
pub struct ServiceState {
    pub host: String,
    pub upstream: Upstream,
    pub status: ServiceStatus,
}

/// One upstream registered in the gateway.
#[derive(Debug)]
pub struct Service {
    path: String,
    health_check_url: String,
    state: ArcSwap<ServiceState>,
}

impl Service {
    /// Build a service from its record, parsing the upstream address.
    pub fn from_record(record: ServiceRecord) -> Result<Self, RegistryError> {
        let upstream = Upstream::parse(&record.host)?;
        Ok(Self {
            path: record.path.trim_matches('/').to_string(),
            health_check_url: record.health_check_url,
            state: ArcSwap::from_pointee(ServiceState {
                host: record.host,
                upstream,
                status: record.status,
            }),
        })
    }

    /// Path as registered, slashes trimmed but case preserved.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn key(&self) -> String {
        normalize_prefix(&self.path)
    }

    pub fn health_check_url(&self) -> &str {
        &self.health_check_url
    }

    /// Consistent view of host, upstream and status.
    pub fn state(&self) -> Arc<ServiceState> {
        self.state.load_full()
    }

    pub fn status(&self) -> ServiceStatus {
        self.state.load().status
    }

    /// Unconditionally set the status, returning the previous one.
    pub fn set_status(&self, status: ServiceStatus) -> ServiceStatus {
        let previous = self.state.rcu(|current| {
            let mut next = ServiceState::clone(current);
            next.status = status;
            next
        });
        previous.status
    }

    /// Set the status only if it is still `expected`.
    pub fn transition(&self, expected: ServiceStatus, next: ServiceStatus) -> bool {
        let mut applied = false;
        self.state.rcu(|current| {
            applied = current.status == expected;
            if applied {
                let mut updated = ServiceState::clone(current);
                updated.status = next;
                Arc::new(updated)
            } else {
                Arc::clone(current)
            }
        });
        applied
    }

    /// Address the liveness probe connects to.
    ///
    /// Falls back to the upstream's own `host:port` when no health check
    /// address was given, and accepts a full URL by keeping its authority.
    pub fn probe_target(&self) -> String {
        let configured = self.health_check_url.trim();
        if configured.is_empty() {
            return self.state.load().upstream.socket_target();
        }
        if configured.contains("://") {
            if let Ok(upstream) = Upstream::parse(configured) {
                return upstream.socket_target();
            }
        }
        configured.to_string()
    }

    pub fn record(&self) -> ServiceRecord {
        let state = self.state.load();
        ServiceRecord {
            host: state.host.clone(),
            path: self.path.clone(),
            status: state.status,
            health_check_url: self.health_check_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(host: &str, path: &str, health: &str) -> ServiceRecord {
        ServiceRecord {
            host: host.to_string(),
            path: path.to_string(),
            status: ServiceStatus::Checking,
            health_check_url: health.to_string(),
        }
    }

    #[test]
    fn status_wire_format() {
        assert_eq!(serde_json::to_string(&ServiceStatus::Checking).unwrap(), "\"CHECKING\"");
        let parsed: ServiceStatus = serde_json::from_str("\"PAUSE\"").unwrap();
        assert_eq!(parsed, ServiceStatus::Pause);
    }

    #[test]
    fn record_uses_camel_case_health_field() {
        let json = r#"{"host":"http://127.0.0.1:9002","path":"billing","healthCheckURL":"127.0.0.1:9002"}"#;
        let parsed: ServiceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.health_check_url, "127.0.0.1:9002");
        assert_eq!(parsed.status, ServiceStatus::Checking);

        let missing: ServiceRecord = serde_json::from_str(r#"{"path":"x"}"#).unwrap();
        assert!(missing.health_check_url.is_empty());
    }

    #[test]
    fn prefixes_and_hints() {
        assert_eq!(normalize_prefix("/Orders/"), "orders");
        assert_eq!(normalize_prefix("///"), "");
        assert_eq!(resolve_hint("/Orders/123").as_deref(), Some("orders"));
        assert_eq!(resolve_hint("//"), None);
    }

    #[test]
    fn upstream_rejects_relative_and_foreign_schemes() {
        assert!(Upstream::parse("127.0.0.1:9001").is_err());
        assert!(Upstream::parse("ftp://files.local").is_err());
        assert!(Upstream::parse("").is_err());
        assert!(Upstream::parse("https://api.internal").is_err());
        assert!(Upstream::parse("http://api.internal").is_ok());
    }

    #[test]
    fn target_uri_joins_base_path_and_queries() {
        let plain = Upstream::parse("http://127.0.0.1:9001").unwrap();
        assert_eq!(
            plain.target_uri("/123", None).unwrap().to_string(),
            "http://127.0.0.1:9001/123"
        );

        let based = Upstream::parse("http://svc.local/api?key=1").unwrap();
        assert_eq!(
            based.target_uri("/items", Some("page=2")).unwrap().to_string(),
            "http://svc.local/api/items?key=1&page=2"
        );
        assert_eq!(based.authority(), "svc.local");
        assert_eq!(based.socket_target(), "svc.local:80");
    }

    #[test]
    fn status_updates_are_atomic_swaps() {
        let service = Service::from_record(record("http://127.0.0.1:9001", "/orders/", "")).unwrap();
        assert_eq!(service.path(), "orders");
        assert_eq!(service.status(), ServiceStatus::Checking);

        assert_eq!(service.set_status(ServiceStatus::Up), ServiceStatus::Checking);
        assert!(!service.transition(ServiceStatus::Checking, ServiceStatus::Down));
        assert_eq!(service.status(), ServiceStatus::Up);
        assert!(service.transition(ServiceStatus::Up, ServiceStatus::Down));
        assert_eq!(service.status(), ServiceStatus::Down);
    }

    #[test]
    fn probe_target_fallbacks() {
        let explicit = Service::from_record(record("http://10.0.0.1:80", "a", "10.0.0.1:8081")).unwrap();
        assert_eq!(explicit.probe_target(), "10.0.0.1:8081");

        let from_url = Service::from_record(record("http://10.0.0.1", "b", "http://10.0.0.2:7000/health")).unwrap();
        assert_eq!(from_url.probe_target(), "10.0.0.2:7000");

        let fallback = Service::from_record(record("http://10.0.0.1", "c", "")).unwrap();
        assert_eq!(fallback.probe_target(), "10.0.0.1:80");
    }
}
