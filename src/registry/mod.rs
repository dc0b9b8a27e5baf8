//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! Static config / snapshot / discovery
//!     → service.rs (parse upstream, build Service)
//!     → map.rs (insert under lower-cased prefix, snapshot to store)
//!
//! Request path
//!     → map.rs (longest matching prefix)
//!     → Service (status + upstream target)
//!
//! Health monitor
//!     → Service::transition (compare-and-swap status)
//!     → map.rs (snapshot)
//! ```

pub mod map;
pub mod service;

pub use map::ServiceRegistry;
pub use service::{
    normalize_prefix, resolve_hint, Service, ServiceRecord, ServiceState, ServiceStatus, Upstream,
};
