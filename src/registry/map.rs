//! The authoritative prefix → service map.
//!
//! # Responsibilities
//! - Own every structural mutation (add, remove) and status change
//!   driven by operators (pause, resume)
//! - Resolve request paths to a registered prefix
//! - Snapshot the full map to the store after each mutation
//! - Restore from the store at startup
//!
//! # Design Decisions
//! - One reader/writer lock guards the map; per-service state is swapped
//!   atomically inside `Service`, so status reads never take the map lock
//!   for writing
//! - Longest matching prefix wins
//! - Snapshot writes are serialized so the last mutation's snapshot is the
//!   last one stored; failures are logged and never roll back the mutation

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::error::RegistryError;
use crate::observability::metrics;
use crate::registry::service::{
    normalize_prefix, resolve_hint, Service, ServiceRecord, ServiceStatus,
};
use crate::store::SnapshotStore;

pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Arc<Service>>>,
    store: Arc<dyn SnapshotStore>,
    snapshot_key: String,
    persist_lock: Mutex<()>,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.len())
            .field("snapshot_key", &self.snapshot_key)
            .finish()
    }
}

impl ServiceRegistry {
    /// Create an empty registry persisting under `snapshot_key`.
    pub fn new(store: Arc<dyn SnapshotStore>, snapshot_key: impl Into<String>) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            store,
            snapshot_key: snapshot_key.into(),
            persist_lock: Mutex::new(()),
        }
    }

    /// Create a registry pre-seeded with `services`, without persisting.
    pub fn with_services(
        store: Arc<dyn SnapshotStore>,
        snapshot_key: impl Into<String>,
        services: impl IntoIterator<Item = Service>,
    ) -> Self {
        let registry = Self::new(store, snapshot_key);
        for service in services {
            registry.insert(service);
        }
        registry
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }

    /// Insert without persisting. Returns the key, or `None` for an empty path.
    fn insert(&self, service: Service) -> Option<String> {
        let key = service.key();
        if key.is_empty() {
            return None;
        }
        let count = {
            let mut services = self.services.write();
            services.insert(key.clone(), Arc::new(service));
            services.len()
        };
        metrics::record_registry_size(count);
        Some(key)
    }

    /// Insert or overwrite the entry for the service's prefix.
    ///
    /// A service whose trimmed path is empty is ignored. Returns the key the
    /// service was stored under.
    pub async fn add(&self, service: Service) -> Option<String> {
        let key = self.insert(service)?;
        tracing::info!(service = %key, "Service registered");
        self.persist().await;
        Some(key)
    }

    /// Remove the entry resolved from `hint`. Unknown paths are a no-op.
    pub async fn remove(&self, hint: &str) -> bool {
        let Some(key) = resolve_hint(hint) else {
            return false;
        };
        let removed = {
            let mut services = self.services.write();
            let removed = services.remove(&key).is_some();
            metrics::record_registry_size(services.len());
            removed
        };
        if removed {
            tracing::info!(service = %key, "Service removed");
            metrics::clear_service_status(&key);
            self.persist().await;
        }
        removed
    }

    /// Suspend health checking and routing for the resolved service.
    pub async fn pause(&self, hint: &str) -> bool {
        self.operator_status(hint, ServiceStatus::Pause).await
    }

    /// Return a paused service to `CHECKING`; the next probe decides UP/DOWN.
    pub async fn resume(&self, hint: &str) -> bool {
        self.operator_status(hint, ServiceStatus::Checking).await
    }

    async fn operator_status(&self, hint: &str, status: ServiceStatus) -> bool {
        let Some(service) = resolve_hint(hint).and_then(|key| self.get(&key)) else {
            return false;
        };
        let previous = service.set_status(status);
        tracing::info!(
            service = %service.key(),
            from = %previous,
            to = %status,
            "Service status set by operator"
        );
        metrics::record_service_status(&service.key(), status);
        self.persist().await;
        true
    }

    pub fn get(&self, key: &str) -> Option<Arc<Service>> {
        self.services.read().get(key).cloned()
    }

    /// Longest registered prefix of the lower-cased `request_path`.
    pub fn find(&self, request_path: &str) -> Option<String> {
        self.resolve(request_path).map(|(key, _)| key)
    }

    /// Like [`find`](Self::find) but also returns the service.
    pub fn resolve(&self, request_path: &str) -> Option<(String, Arc<Service>)> {
        let lowered = request_path.trim_start_matches('/').to_ascii_lowercase();
        let services = self.services.read();
        services
            .iter()
            .filter(|(key, _)| lowered.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(key, service)| (key.clone(), Arc::clone(service)))
    }

    /// All entries, ordered by key.
    pub fn services(&self) -> Vec<(String, Arc<Service>)> {
        let mut entries: Vec<_> = self
            .services
            .read()
            .iter()
            .map(|(key, service)| (key.clone(), Arc::clone(service)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Write the full map to the store, replacing any earlier snapshot.
    pub async fn snapshot_all(&self) -> Result<(), RegistryError> {
        let _writer = self.persist_lock.lock().await;
        let payload = {
            let services = self.services.read();
            let records: BTreeMap<&str, ServiceRecord> = services
                .iter()
                .map(|(key, service)| (key.as_str(), service.record()))
                .collect();
            serde_json::to_vec(&records)?
        };
        self.store.set(&self.snapshot_key, payload).await?;
        tracing::debug!(key = %self.snapshot_key, "Registry snapshot written");
        Ok(())
    }

    /// Snapshot, logging instead of returning failures.
    pub async fn persist(&self) {
        if let Err(e) = self.snapshot_all().await {
            tracing::warn!(error = %e, key = %self.snapshot_key, "Failed to persist registry snapshot");
            metrics::record_snapshot_failure();
        }
    }

    /// Merge the stored snapshot into the map, overwriting by prefix.
    ///
    /// An absent snapshot restores nothing. Records come back as `CHECKING`
    /// unless they were paused. Records whose host no longer parses are
    /// skipped. Returns the number of services restored.
    pub async fn load_snapshot(&self) -> Result<usize, RegistryError> {
        let Some(bytes) = self.store.get(&self.snapshot_key).await? else {
            tracing::debug!(key = %self.snapshot_key, "No registry snapshot found");
            return Ok(0);
        };
        let records: HashMap<String, ServiceRecord> = serde_json::from_slice(&bytes)?;

        let mut restored = 0;
        for (stored_key, mut record) in records {
            if record.path.trim_matches('/').is_empty() {
                record.path = stored_key.clone();
            }
            record.status = match record.status {
                ServiceStatus::Pause => ServiceStatus::Pause,
                _ => ServiceStatus::Checking,
            };
            match Service::from_record(record) {
                Ok(service) => {
                    if self.insert(service).is_some() {
                        restored += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(service = %stored_key, error = %e, "Skipping unrestorable snapshot entry");
                }
            }
        }

        tracing::info!(restored, "Registry snapshot loaded");
        Ok(restored)
    }
}
