//! Startup orchestration.
//!
//! # Sequence
//! ```text
//! seed registry from static config
//!     → load snapshot (merge, overwrite by prefix)
//!     → write a fresh snapshot
//!     → bind listener
//!     → serve + health monitor, until shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast on bad static config or an unbindable address
//! - An unreadable snapshot is logged and startup continues with the seeds
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::GatewayServer;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::registry::{Service, ServiceRecord, ServiceRegistry, ServiceStatus};
use crate::store::{self, SnapshotStore};

/// Build the registry: static services, then the stored snapshot on top.
pub async fn bootstrap(
    config: &GatewayConfig,
    store: Arc<dyn SnapshotStore>,
) -> Result<Arc<ServiceRegistry>, GatewayError> {
    let mut seeds = Vec::with_capacity(config.services.len());
    for entry in &config.services {
        seeds.push(Service::from_record(ServiceRecord {
            host: entry.host.clone(),
            path: entry.path.clone(),
            status: ServiceStatus::Checking,
            health_check_url: entry.health_check_url.clone(),
        })?);
    }

    let registry = Arc::new(ServiceRegistry::with_services(
        store,
        config.store.key.clone(),
        seeds,
    ));
    tracing::info!(services = registry.len(), "Registry seeded from configuration");

    if let Err(e) = registry.load_snapshot().await {
        tracing::warn!(error = %e, "Failed to load registry snapshot, continuing with configured services");
    }
    registry.persist().await;

    Ok(registry)
}

/// Start the gateway and serve until `shutdown` fires.
pub async fn run(config: GatewayConfig, shutdown: ShutdownSignal) -> Result<(), GatewayError> {
    let store: Arc<dyn SnapshotStore> = Arc::from(store::from_config(&config.store));
    let registry = bootstrap(&config, store).await?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                // Three missed ticks before a status gauge is dropped.
                let gauge_idle = config
                    .health_check
                    .enabled
                    .then(|| Duration::from_secs(config.health_check.interval_secs * 3));
                metrics::init_metrics(addr, gauge_idle)
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| GatewayError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    GatewayServer::new(config, registry)
        .run(listener, shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::store::MemoryStore;

    fn static_service(host: &str, path: &str) -> ServiceConfig {
        ServiceConfig {
            host: host.to_string(),
            path: path.to_string(),
            health_check_url: String::new(),
        }
    }

    #[tokio::test]
    async fn snapshot_overrides_static_seed_by_prefix() {
        let store = Arc::new(MemoryStore::new());
        let mut config = GatewayConfig::default();

        // Earlier run registered "billing" and moved "orders".
        let previous = ServiceRegistry::new(store.clone(), config.store.key.clone());
        for (host, path) in [("http://10.0.0.2:9001", "orders"), ("http://10.0.0.3:9002", "billing")] {
            previous
                .add(Service::from_record(ServiceRecord {
                    host: host.into(),
                    path: path.into(),
                    ..Default::default()
                }).unwrap())
                .await;
        }

        config.services.push(static_service("http://127.0.0.1:9001", "orders"));
        config.services.push(static_service("http://127.0.0.1:9003", "users"));

        let registry = bootstrap(&config, store.clone()).await.unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("orders").unwrap().state().host, "http://10.0.0.2:9001");
        assert!(registry.get("users").is_some());

        // The merged view was written back.
        let reloaded = ServiceRegistry::new(store, config.store.key.clone());
        assert_eq!(reloaded.load_snapshot().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn invalid_static_host_is_fatal() {
        let mut config = GatewayConfig::default();
        config.services.push(static_service("nonsense", "orders"));
        let result = bootstrap(&config, Arc::new(MemoryStore::new())).await;
        assert!(matches!(result, Err(GatewayError::Registry(_))));
    }
}
