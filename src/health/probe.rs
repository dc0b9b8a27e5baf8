//! Transport-level liveness probe.
//!
//! A service is UP if a TCP connection to its probe target can be opened
//! within the timeout. Nothing is sent over the connection.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time;

use crate::registry::ServiceStatus;

/// Probe `target` (`host:port`), returning the candidate status.
pub async fn probe(target: &str, timeout: Duration) -> ServiceStatus {
    match time::timeout(timeout, TcpStream::connect(target)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            ServiceStatus::Up
        }
        Ok(Err(e)) => {
            tracing::debug!(target = %target, error = %e, "Probe failed: connection error");
            ServiceStatus::Down
        }
        Err(_) => {
            tracing::debug!(target = %target, timeout = ?timeout, "Probe failed: timeout");
            ServiceStatus::Down
        }
    }
}
