//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (monitor.rs)
//!     → for each non-paused service
//!     → probe.rs (TCP connect with timeout)
//!     → UP / DOWN candidate
//!     → Service::transition if it differs
//!     → registry snapshot
//! ```
//!
//! # Design Decisions
//! - A failed probe is not an error; it is the signal for DOWN
//! - DOWN services stay registered; only operators remove services
//! - Health state is per-service and persisted with the registry

pub mod monitor;
pub mod probe;

pub use monitor::HealthMonitor;
pub use probe::probe;
