//! Reconnection Policy
//!
//! Fixed-interval retry for the notification stream. Every attempt waits
//! the same configured delay; there is no exponential growth and no jitter.
//! The attempt budget caps consecutive failures, and a successful open
//! resets the counter so a flaky-then-healthy link does not exhaust it.

use std::time::Duration;

use crate::ConnectionSettings;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Fixed delay between reconnection attempts.
    pub interval: Duration,
    /// Maximum number of consecutive attempts (0 = unlimited).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            max_attempts: 5,
        }
    }
}

impl ReconnectConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Create configuration from [`ConnectionSettings`].
    #[must_use]
    pub const fn from_settings(settings: &ConnectionSettings) -> Self {
        Self {
            interval: settings.reconnect_interval,
            max_attempts: settings.max_reconnect_attempts,
        }
    }
}

/// Fixed-interval reconnection policy with an attempt budget.
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt_count: u32,
}

impl ReconnectPolicy {
    /// Create a new reconnection policy.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempt_count: 0,
        }
    }

    /// Get the delay before the next attempt.
    ///
    /// Returns `None` once the attempt budget is exhausted.
    #[must_use]
    pub const fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_attempts > 0 && self.attempt_count >= self.config.max_attempts {
            return None;
        }

        self.attempt_count += 1;
        Some(self.config.interval)
    }

    /// Reset the policy after a successful connection.
    pub const fn reset(&mut self) {
        self.attempt_count = 0;
    }

    /// Get the current attempt count.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Check if reconnection should continue.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        self.config.max_attempts == 0 || self.attempt_count < self.config.max_attempts
    }
}
