//! WebSocket connection management, heartbeat, message handling, and broadcasting.

pub mod connection;
pub mod handler;
pub mod heartbeat;
pub mod registry;
pub mod session;
