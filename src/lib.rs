//! Path-prefix service gateway library.

pub mod admin;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod store;

pub use config::GatewayConfig;
pub use error::{GatewayError, RegistryError, StoreError};
pub use http::GatewayServer;
pub use lifecycle::{Shutdown, ShutdownSignal};
pub use registry::{Service, ServiceRecord, ServiceRegistry, ServiceStatus};
