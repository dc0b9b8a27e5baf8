//! Registry survival across restarts through the file store.

use std::sync::Arc;

use service_gateway::config::{GatewayConfig, ServiceConfig};
use service_gateway::lifecycle::startup::bootstrap;
use service_gateway::store::{FileStore, SnapshotStore};
use service_gateway::ServiceStatus;

mod common;

fn scratch_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("gateway-persist-{}", uuid::Uuid::new_v4()))
}

#[tokio::test]
async fn registrations_survive_restart() {
    let dir = scratch_dir();
    let mut config = GatewayConfig::default();
    config.services.push(ServiceConfig {
        host: "http://127.0.0.1:9001".into(),
        path: "orders".into(),
        health_check_url: String::new(),
    });

    {
        let store: Arc<dyn SnapshotStore> = Arc::new(FileStore::new(&dir));
        let registry = bootstrap(&config, store).await.unwrap();
        registry
            .add(common::service("http://127.0.0.1:9002", "billing", "127.0.0.1:9002"))
            .await;
        registry.pause("billing").await;
        registry.get("orders").unwrap().set_status(ServiceStatus::Up);
        registry.persist().await;
    }

    let store: Arc<dyn SnapshotStore> = Arc::new(FileStore::new(&dir));
    let registry = bootstrap(&config, store).await.unwrap();

    assert_eq!(registry.len(), 2);
    let billing = registry.get("billing").unwrap();
    assert_eq!(billing.health_check_url(), "127.0.0.1:9002");
    assert_eq!(billing.status(), ServiceStatus::Pause);
    assert_eq!(registry.get("orders").unwrap().status(), ServiceStatus::Checking);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn removal_is_persisted() {
    let dir = scratch_dir();
    let config = GatewayConfig::default();

    {
        let registry = bootstrap(&config, Arc::new(FileStore::new(&dir))).await.unwrap();
        registry.add(common::service("http://127.0.0.1:9002", "billing", "127.0.0.1:9002")).await;
        assert!(registry.remove("/billing/anything").await);
    }

    let registry = bootstrap(&config, Arc::new(FileStore::new(&dir))).await.unwrap();
    assert!(registry.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}
