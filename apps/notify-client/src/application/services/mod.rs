//! Notification Service
//!
//! Composition root tying the connection manager and the dispatcher
//! together behind one handle. Callers construct a service from
//! configuration, subscribe their handlers, and drive the connection
//! lifecycle; everything else (reconnection, decoding, fan-out) happens
//! internally.

use crate::domain::notification::NotificationEvent;
use crate::infrastructure::config::{ClientConfig, ConfigError};
use crate::infrastructure::dispatch::{
    DispatchConfig, NOTIFICATION_TOPIC, NotificationDispatcher, SubscriptionHandle,
};
use crate::infrastructure::ws::{ConnectionConfig, ConnectionManager, ConnectionState, ReconnectConfig};

/// Client for the real-time document notification channel.
///
/// One instance owns at most one WebSocket connection. Multiple consumers
/// share an instance by subscribing; there is no process-wide singleton.
#[derive(Debug)]
pub struct NotificationService {
    manager: ConnectionManager,
    dispatcher: NotificationDispatcher,
}

impl NotificationService {
    /// Build a service from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured base URL is empty or uses an
    /// unsupported scheme.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let dispatcher =
            NotificationDispatcher::new(DispatchConfig::from_settings(&config.dispatch));
        let manager = ConnectionManager::new(
            ConnectionConfig {
                url: config.notifications_url(),
                reconnect: ReconnectConfig::from_settings(&config.connection),
            },
            dispatcher.clone(),
        );

        Ok(Self {
            manager,
            dispatcher,
        })
    }

    /// Open the notification connection. Idempotent.
    pub fn connect(&self) {
        self.manager.connect();
    }

    /// Tear the connection down and drop any buffered events. Idempotent.
    pub fn disconnect(&self) {
        self.manager.disconnect();
    }

    /// Check whether the transport is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Get the current connection lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// Send a JSON payload to the server; silently dropped when the
    /// connection is not open.
    pub fn send(&self, payload: serde_json::Value) {
        self.manager.send(payload);
    }

    /// Register `handler` for events published under `topic`.
    pub fn subscribe(
        &self,
        topic: impl Into<String>,
        handler: impl Fn(NotificationEvent) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.dispatcher.subscribe(topic, handler)
    }

    /// Register `handler` for inbound document notifications.
    pub fn subscribe_notifications(
        &self,
        handler: impl Fn(NotificationEvent) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.dispatcher.subscribe(NOTIFICATION_TOPIC, handler)
    }

    /// Access the underlying dispatcher, for publishing locally-sourced
    /// events or inspecting the throttle buffer.
    #[must_use]
    pub const fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }
}
