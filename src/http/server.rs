//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Dispatch each request: root, discovery, or proxied upstream
//! - Run the health monitor and admin API alongside the listener
//!
//! # Dispatch
//! ```text
//! path percent-decoded, trimmed of '/'
//!     empty            → 200
//!     == discovery     → discovery::register
//!     no prefix match  → 404
//!     service not UP   → 404
//!     otherwise        → dispatch::forward (502 on upstream failure)
//! ```

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{client::legacy::connect::HttpConnector, client::legacy::Client, rt::TokioExecutor};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::config::GatewayConfig;
use crate::health::HealthMonitor;
use crate::http::dispatch::{self, HttpClient};
use crate::http::discovery;
use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::registry::{ServiceRegistry, ServiceStatus};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
    pub client: HttpClient,
    /// Normalized discovery path (trimmed, lower-cased).
    pub discovery_path: Arc<str>,
    pub discovery_body_limit: usize,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    registry: Arc<ServiceRegistry>,
}

impl GatewayServer {
    /// Create a new server over an already bootstrapped registry.
    pub fn new(config: GatewayConfig, registry: Arc<ServiceRegistry>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.request_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            registry: registry.clone(),
            client,
            discovery_path: Arc::from(config.discovery.normalized_path()),
            discovery_body_limit: config.discovery.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            registry,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .fallback(gateway_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// The request router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Starts the health monitor and, when enabled, the admin API. After the
    /// signal, in-flight requests get `timeouts.request_secs` to finish; the
    /// store is closed either way.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.config.health_check.enabled {
            let monitor = HealthMonitor::new(self.registry.clone(), &self.config.health_check);
            tokio::spawn(monitor.run(shutdown.clone()));
        } else {
            tracing::info!("Active health checks disabled");
        }

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin_router = admin::setup_admin_router(
                self.registry.clone(),
                self.config.admin.api_key.clone(),
            );
            let mut admin_shutdown = shutdown.clone();
            tracing::info!(address = %admin_listener.local_addr()?, "Admin API starting");
            tokio::spawn(async move {
                if let Err(e) = axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(async move { admin_shutdown.recv().await })
                    .await
                {
                    tracing::error!(error = %e, "Admin API failed");
                }
            });
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<std::net::SocketAddr>();
        let grace = Duration::from_secs(self.config.timeouts.request_secs);
        let mut server_shutdown = shutdown.clone();
        let mut drain_shutdown = shutdown;
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .into_future();

        // Connections still open after the grace period are abandoned.
        tokio::select! {
            result = serve => result?,
            _ = async {
                drain_shutdown.recv().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(grace = ?grace, "In-flight connections outlived shutdown grace period");
            }
        }

        if let Err(e) = self.registry.store().close().await {
            tracing::warn!(error = %e, "Failed to close snapshot store");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Single entry point for every inbound request.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let path = dispatch::decode_path(request.uri().path()).into_owned();
    let trimmed = path.trim_matches('/');

    if trimmed.is_empty() {
        return StatusCode::OK.into_response();
    }

    if trimmed.to_ascii_lowercase() == *state.discovery_path {
        let response = discovery::register(&state, request).await;
        metrics::record_request(response.status().as_u16(), "discovery", start);
        return response;
    }

    let request_id = request_id(request.headers()).to_string();

    let Some((key, service)) = state.registry.resolve(trimmed) else {
        tracing::debug!(request_id = %request_id, path = %path, "No service matched");
        metrics::record_request(404, "none", start);
        return StatusCode::NOT_FOUND.into_response();
    };

    let snapshot = service.state();
    if snapshot.status != ServiceStatus::Up {
        tracing::debug!(
            request_id = %request_id,
            service = %key,
            status = %snapshot.status,
            "Service not available"
        );
        metrics::record_request(404, &key, start);
        return StatusCode::NOT_FOUND.into_response();
    }

    let response = dispatch::forward(&state.client, &key, &snapshot.upstream, request).await;
    metrics::record_request(response.status().as_u16(), &key, start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Service, ServiceRecord};
    use crate::store::MemoryStore;
    use axum::http::Method;
    use tower::ServiceExt;

    fn server() -> GatewayServer {
        let registry = Arc::new(ServiceRegistry::new(Arc::new(MemoryStore::new()), "_TEST_"));
        GatewayServer::new(GatewayConfig::default(), registry)
    }

    async fn send(router: Router, method: Method, uri: &str, body: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn root_answers_ok_with_empty_body() {
        let server = server();
        let (status, body) = send(server.router(), Method::GET, "/", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let server = server();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = server.router().oneshot(request).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn unknown_prefix_is_not_found() {
        let server = server();
        let (status, _) = send(server.router(), Method::GET, "/unknown/1", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_up_services_are_not_found() {
        let server = server();
        server
            .registry()
            .add(
                Service::from_record(ServiceRecord {
                    host: "http://127.0.0.1:9001".into(),
                    path: "orders".into(),
                    status: ServiceStatus::Checking,
                    health_check_url: "127.0.0.1:9001".into(),
                })
                .unwrap(),
            )
            .await;

        for status in [ServiceStatus::Checking, ServiceStatus::Down, ServiceStatus::Pause] {
            server.registry().get("orders").unwrap().set_status(status);
            let (code, _) = send(server.router(), Method::GET, "/orders/123", "").await;
            assert_eq!(code, StatusCode::NOT_FOUND, "status {status}");
        }
    }

    #[tokio::test]
    async fn discovery_requires_health_check_url() {
        let server = server();
        let (status, body) = send(
            server.router(),
            Method::POST,
            "/discovery",
            r#"{"host":"http://127.0.0.1:9002","path":"billing"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Health check url is not valid");
        assert!(server.registry().is_empty());
    }

    #[tokio::test]
    async fn discovery_rejects_other_methods() {
        let server = server();
        let (status, _) = send(server.router(), Method::GET, "/discovery", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn discovery_rejects_malformed_records() {
        let server = server();
        let cases = [
            "not json",
            r#"{"host":"http://127.0.0.1:9002","path":"/","healthCheckURL":"127.0.0.1:9002"}"#,
            r#"{"host":"127.0.0.1:9002","path":"billing","healthCheckURL":"127.0.0.1:9002"}"#,
            r#"{"host":"http://127.0.0.1:9002","path":"Discovery","healthCheckURL":"127.0.0.1:9002"}"#,
        ];
        for body in cases {
            let (status, _) = send(server.router(), Method::POST, "/discovery", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        }
        assert!(server.registry().is_empty());
    }

    #[tokio::test]
    async fn discovery_registers_as_checking() {
        let server = server();
        let (status, body) = send(
            server.router(),
            Method::POST,
            "/Discovery/",
            r#"{"host":"http://127.0.0.1:9002","path":"/Billing/","healthCheckURL":"127.0.0.1:9002","status":"UP"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let record: ServiceRecord = serde_json::from_str(&body).unwrap();
        assert_eq!(record.path, "Billing");
        assert_eq!(record.status, ServiceStatus::Checking);

        let service = server.registry().get("billing").unwrap();
        assert_eq!(service.status(), ServiceStatus::Checking);

        // Not routable until a probe confirms it.
        let (status, _) = send(server.router(), Method::GET, "/billing/invoices", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn discovery_path_shadows_registered_prefix() {
        let server = server();
        server
            .registry()
            .add(
                Service::from_record(ServiceRecord {
                    host: "http://127.0.0.1:9001".into(),
                    path: "disc".into(),
                    status: ServiceStatus::Up,
                    health_check_url: "127.0.0.1:9001".into(),
                })
                .unwrap(),
            )
            .await;
        let (status, _) = send(server.router(), Method::GET, "/discovery", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
