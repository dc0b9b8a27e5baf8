//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every service that is not paused
//! - Apply UP/DOWN transitions to the registry and persist them
//!
//! # Design Decisions
//! - Probes run sequentially within a tick; a hanging probe delays the rest
//!   of the tick by at most the probe timeout
//! - The first tick fires one interval after start, so new services stay
//!   CHECKING until then
//! - A transition is applied only if the status read before probing is
//!   still current, so a concurrent pause wins over a probe result
//! - Shutdown cancels an in-flight tick

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::schema::HealthCheckConfig;
use crate::health::probe::probe;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::registry::{ServiceRegistry, ServiceStatus};

pub struct HealthMonitor {
    registry: Arc<ServiceRegistry>,
    interval: Duration,
    timeout: Duration,
}

impl HealthMonitor {
    pub fn new(registry: Arc<ServiceRegistry>, config: &HealthCheckConfig) -> Self {
        Self {
            registry,
            interval: Duration::from_secs(config.interval_secs),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Override the tick interval and probe timeout.
    pub fn with_timing(mut self, interval: Duration, timeout: Duration) -> Self {
        self.interval = interval;
        self.timeout = timeout;
        self
    }

    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(
            interval = ?self.interval,
            timeout = ?self.timeout,
            "Health monitor starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
                _ = async {
                    ticker.tick().await;
                    self.check_all().await
                } => {}
            }
        }
    }

    /// Run one tick. Returns the number of status transitions applied.
    pub async fn check_all(&self) -> usize {
        let mut transitions = 0;

        let services = self.registry.services();
        metrics::record_registry_size(services.len());

        for (key, service) in services {
            let current = service.status();
            if current == ServiceStatus::Pause {
                metrics::record_service_status(&key, current);
                continue;
            }

            let target = service.probe_target();
            let candidate = probe(&target, self.timeout).await;
            if candidate != current && service.transition(current, candidate) {
                tracing::info!(
                    service = %key,
                    target = %target,
                    from = %current,
                    to = %candidate,
                    "Service status changed"
                );
                self.registry.persist().await;
                transitions += 1;
            } else if candidate != current {
                tracing::debug!(service = %key, "Status changed during probe, result discarded");
            }

            // Every live service's gauge is refreshed each tick.
            metrics::record_service_status(&key, service.status());
        }

        transitions
    }
}
