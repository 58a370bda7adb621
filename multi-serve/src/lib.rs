//! Start and stop a group of heterogeneous network servers as one unit.
//!
//! Each listener (axum HTTP, jsonrpsee JSON-RPC, UDP packet server, or any
//! custom type) is wrapped in a [`Service`](service::Service). A
//! [`MultiServer`](server::MultiServer) starts the group sequentially and
//! fail-fast, and stops it concurrently with per-service graceful-shutdown
//! deadlines, collecting every failure.

/// The multi-serve prelude for convenient importing of the most common items.
pub mod prelude;

/// Contains the `Service` trait every listener implements.
pub mod service;
/// Contains `MultiServer`, the service aggregator.
pub mod server;
/// Contains the `MultiServerBuilder` for assembling a `MultiServer`.
pub mod builder;
/// Contains the signal-driven `run` loop of `MultiServer`.
pub mod runner;
/// Contains `Service` implementations for concrete transports.
pub mod adapter;
/// Contains serializable adapter settings.
pub mod config;
/// Contains the reporters that receive background serve-loop failures.
pub mod report;
/// Contains the error types used by the library.
pub mod error;

// --- Public Dependency Re-exports (For Version Safety) ---

#[cfg(feature = "http")]
pub use axum;

#[cfg(feature = "http")]
pub use axum_server;

#[cfg(feature = "jsonrpsee")]
pub use jsonrpsee;

pub use error::Error;
pub use server::MultiServer;
pub use service::Service;
