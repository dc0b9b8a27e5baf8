//! Client for registering services with a gateway's discovery endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Registration body accepted by the discovery endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    /// Upstream base address, e.g. "http://10.0.0.5:9001".
    pub host: String,
    /// Path prefix to serve under.
    pub path: String,
    /// `host:port` the gateway probes for liveness.
    #[serde(rename = "healthCheckURL")]
    pub health_check_url: String,
}

/// The record as stored by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredService {
    pub host: String,
    pub path: String,
    pub status: String,
    #[serde(rename = "healthCheckURL")]
    pub health_check_url: String,
}

pub struct DiscoveryClient {
    client: Client,
    gateway_url: String,
    discovery_path: String,
}

impl DiscoveryClient {
    pub fn new(gateway_url: &str) -> Self {
        Self::with_path(gateway_url, "discovery")
    }

    pub fn with_path(gateway_url: &str, discovery_path: &str) -> Self {
        Self {
            client: Client::new(),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            discovery_path: discovery_path.trim_matches('/').to_string(),
        }
    }

    /// Register (or re-register) a service.
    pub async fn register(&self, req: &Registration) -> Result<RegisteredService, Box<dyn std::error::Error>> {
        let resp = self.client
            .post(format!("{}/{}", self.gateway_url, self.discovery_path))
            .json(req)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(format!("Gateway returned error status {}: {}", status, text).into());
        }

        Ok(serde_json::from_str::<RegisteredService>(&text)?)
    }
}
