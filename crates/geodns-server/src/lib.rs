//! # geodns-server
//!
//! Axum HTTP + `WebSocket` host for the Geo-DNS router.
//!
//! - `GET /ws`: one session per client; every `SIMULATE_TRAFFIC` request is
//!   routed to its nearest node and the decision is broadcast to all clients
//! - `GET /`, `/health`, `/metrics`: identity, liveness and Prometheus text
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::GeoServer;
pub use shutdown::ShutdownCoordinator;
pub use websocket::registry::{BroadcastReport, ConnectionRegistry};
