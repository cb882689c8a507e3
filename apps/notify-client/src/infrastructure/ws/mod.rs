//! WebSocket Adapter
//!
//! Owns the single physical connection to the notification service:
//!
//! - **client**: connection manager and per-session connection task
//! - **codec**: JSON wire codec for inbound notification frames
//! - **reconnect**: fixed-interval reconnection policy

pub mod client;
pub mod codec;
pub mod reconnect;

pub use client::{ClientError, ConnectionConfig, ConnectionManager, ConnectionState};
pub use codec::{DecodeError, JsonCodec, NotificationFrame};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
