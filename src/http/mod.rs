//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout)
//!     → server.rs gateway_handler (root / discovery / prefix lookup)
//!     → discovery.rs (registration)        or
//!     → dispatch.rs (strip prefix, rewrite, forward)
//!     → headers.rs (hop-by-hop, X-Forwarded-*)
//!     → Send to client
//! ```

pub mod discovery;
pub mod dispatch;
pub mod headers;
pub mod request;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
