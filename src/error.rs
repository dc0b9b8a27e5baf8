//! Error types shared across the gateway.
//!
//! Only errors at the HTTP boundary are visible to clients, and only as a
//! status code. Everything here is either logged or returned to startup code.

use thiserror::Error;

use crate::config::loader::ConfigError;

/// Errors raised by a snapshot store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("invalid store key: {0:?}")]
    InvalidKey(String),
}

/// Errors raised by the service registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("snapshot store failed: {0}")]
    Store(#[from] StoreError),

    #[error("invalid upstream address {address:?}: {reason}")]
    InvalidUpstream { address: String, reason: String },
}

/// Fatal errors during gateway startup.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
