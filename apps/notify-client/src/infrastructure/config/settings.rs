//! Client Configuration Settings
//!
//! Configuration types for the notification client, loaded from environment
//! variables.

use std::time::Duration;

/// Default base address of the notification service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Path of the notification channel, appended to the ws base address.
const NOTIFICATIONS_PATH: &str = "/notifications";

/// Delivery mode for decoded notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Deliver each event to subscribers as soon as it is decoded.
    #[default]
    Immediate,
    /// Buffer events and deliver them in one batch per throttle window.
    Throttled,
}

impl DeliveryMode {
    /// Parse delivery mode from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "throttled" => Self::Throttled,
            _ => Self::Immediate,
        }
    }

    /// Get the mode name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Throttled => "throttled",
        }
    }
}

/// Connection and reconnection settings.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Fixed delay between reconnection attempts.
    pub reconnect_interval: Duration,
    /// Maximum consecutive reconnection attempts before giving up
    /// (0 = unlimited).
    pub max_reconnect_attempts: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            reconnect_interval: Duration::from_millis(3000),
            max_reconnect_attempts: 5,
        }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// How decoded events are delivered to subscribers.
    pub mode: DeliveryMode,
    /// Buffering window used in throttled mode.
    pub throttle_window: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::Immediate,
            throttle_window: Duration::from_millis(5000),
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base address of the notification service (http/https/ws/wss).
    pub base_url: String,
    /// Connection and reconnection settings.
    pub connection: ConnectionSettings,
    /// Dispatcher settings.
    pub dispatch: DispatchSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connection: ConnectionSettings::default(),
            dispatch: DispatchSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `NOTIFY_API_BASE_URL`: service base address (default
    ///   `http://localhost:8080`)
    /// - `NOTIFY_RECONNECT_INTERVAL_MS`: fixed reconnect delay (default 3000)
    /// - `NOTIFY_MAX_RECONNECT_ATTEMPTS`: reconnect budget (default 5)
    /// - `NOTIFY_DELIVERY_MODE`: "immediate" | "throttled" (default immediate)
    /// - `NOTIFY_THROTTLE_WINDOW_MS`: throttle window (default 5000)
    ///
    /// # Errors
    ///
    /// Returns an error if the base address is empty or uses a scheme other
    /// than http, https, ws, or wss.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url =
            std::env::var("NOTIFY_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let connection = ConnectionSettings {
            reconnect_interval: parse_env_duration_millis(
                "NOTIFY_RECONNECT_INTERVAL_MS",
                ConnectionSettings::default().reconnect_interval,
            ),
            max_reconnect_attempts: parse_env_u32(
                "NOTIFY_MAX_RECONNECT_ATTEMPTS",
                ConnectionSettings::default().max_reconnect_attempts,
            ),
        };

        let dispatch = DispatchSettings {
            mode: std::env::var("NOTIFY_DELIVERY_MODE")
                .map(|s| DeliveryMode::from_str_case_insensitive(&s))
                .unwrap_or_default(),
            throttle_window: parse_env_duration_millis(
                "NOTIFY_THROTTLE_WINDOW_MS",
                DispatchSettings::default().throttle_window,
            ),
        };

        let config = Self {
            base_url,
            connection,
            dispatch,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the base address.
    ///
    /// # Errors
    ///
    /// Returns an error if the base address is empty or has an unsupported
    /// scheme.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::EmptyValue("NOTIFY_API_BASE_URL".to_string()));
        }

        let supported = ["http://", "https://", "ws://", "wss://"];
        if !supported.iter().any(|p| self.base_url.starts_with(p)) {
            return Err(ConfigError::UnsupportedScheme(self.base_url.clone()));
        }

        Ok(())
    }

    /// Get the notification channel WebSocket URL.
    ///
    /// Substitutes the ws scheme for the http one and appends the fixed
    /// channel path: `http://host` becomes `ws://host/notifications`,
    /// `https://host` becomes `wss://host/notifications`.
    #[must_use]
    pub fn notifications_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };

        format!("{}{NOTIFICATIONS_PATH}", ws_base.trim_end_matches('/'))
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Base address uses a scheme the client cannot connect with.
    #[error("unsupported base address scheme: {0}")]
    UnsupportedScheme(String),
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
