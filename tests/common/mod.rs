//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use service_gateway::{GatewayConfig, GatewayServer, Service, ServiceRecord, ServiceRegistry, ServiceStatus, Shutdown};
use service_gateway::store::MemoryStore;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Start a backend that answers every request with its request line and
/// Host header, e.g. `GET /123?x=1 host=127.0.0.1:9001`.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(async move {
                        let (read, mut write) = socket.into_split();
                        let mut reader = BufReader::new(read);

                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
                            return;
                        }
                        let mut host = String::new();
                        loop {
                            let mut line = String::new();
                            if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                                break;
                            }
                            let line = line.trim_end();
                            if line.is_empty() {
                                break;
                            }
                            if let Some((name, value)) = line.split_once(':') {
                                if name.eq_ignore_ascii_case("host") {
                                    host = value.trim().to_string();
                                }
                            }
                        }

                        let mut parts = request_line.split_whitespace();
                        let method = parts.next().unwrap_or_default();
                        let target = parts.next().unwrap_or_default();
                        let body = format!("{method} {target} host={host}");
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = write.write_all(response.as_bytes()).await;
                        let _ = write.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that answers with a chunked 200, sends one chunk, then
/// holds the connection open without finishing the body.
pub async fn start_stalling_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (read, mut write) = socket.into_split();
                let mut reader = BufReader::new(read);
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                        return;
                    }
                    if line.trim_end().is_empty() {
                        break;
                    }
                }
                let head = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n";
                if write.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            });
        }
    });

    addr
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn service(host: &str, path: &str, health_check_url: &str) -> Service {
    Service::from_record(ServiceRecord {
        host: host.to_string(),
        path: path.to_string(),
        status: ServiceStatus::Checking,
        health_check_url: health_check_url.to_string(),
    })
    .unwrap()
}

pub fn memory_registry() -> Arc<ServiceRegistry> {
    Arc::new(ServiceRegistry::new(Arc::new(MemoryStore::new()), "_TEST_SERVICES_"))
}

pub struct RunningGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Serve `registry` on an ephemeral port. The health monitor is disabled
/// so tests drive ticks themselves.
pub async fn start_gateway(registry: Arc<ServiceRegistry>) -> RunningGateway {
    start_gateway_with(GatewayConfig::default(), registry).await
}

/// Like [`start_gateway`] with a caller-provided config.
pub async fn start_gateway_with(
    mut config: GatewayConfig,
    registry: Arc<ServiceRegistry>,
) -> RunningGateway {
    config.health_check.enabled = false;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config, registry);
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    RunningGateway { addr, shutdown, handle }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
