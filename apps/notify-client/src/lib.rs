#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Notify Client - Real-Time Document Notification Channel
//!
//! A WebSocket client that maintains a single connection to the document
//! notification service and fans decoded events out to in-process
//! subscribers, reconnecting automatically when the connection drops.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core notification types
//!   - `notification`: Event shape and identity derivation
//!
//! - **Application**: Use cases over the infrastructure
//!   - `services`: The notification service facade
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `ws`: WebSocket connection manager, codec, reconnection policy
//!   - `dispatch`: Topic-keyed fan-out with optional throttled batching
//!   - `config`: Environment-driven configuration
//!   - `telemetry`: Tracing setup
//!
//! # Data Flow
//!
//! ```text
//! Notification WS ----> Connection ----> Json  ----> Dispatcher --> Handler 1
//!                       Manager          Codec       (topics)   --> Handler 2
//!                                                               --> Handler N
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core notification types with no external dependencies.
pub mod domain;

/// Application layer - Use cases over the infrastructure.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::notification::{Actor, NotificationEvent, Subject};

// Application service
pub use application::services::NotificationService;

// Infrastructure config
pub use infrastructure::config::{
    ClientConfig, ConfigError, ConnectionSettings, DeliveryMode, DispatchSettings,
};

// Dispatcher (for integration tests)
pub use infrastructure::dispatch::{
    DispatchConfig, NOTIFICATION_TOPIC, NotificationDispatcher, SubscriptionHandle, WILDCARD_TOPIC,
};

// Connection manager (for integration tests)
pub use infrastructure::ws::{
    ConnectionConfig, ConnectionManager, ConnectionState, JsonCodec, NotificationFrame,
    ReconnectConfig, ReconnectPolicy,
};

// Telemetry
pub use infrastructure::telemetry::init as init_telemetry;
