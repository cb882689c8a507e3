//! Notification Domain Types
//!
//! The decoded, immutable representation of a server-pushed notification.
//! Events are created once by the wire codec and then transferred (never
//! shared mutably) from the connection task to the dispatcher and on to
//! subscriber callbacks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The user that triggered a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable user identifier.
    pub id: String,
    /// Display name at the time the event was emitted.
    pub name: String,
}

/// The document a notification refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Stable document identifier.
    pub id: String,
    /// Document title at the time the event was emitted.
    pub title: String,
}

/// A decoded notification event.
///
/// The `id` is derived deterministically from the source identifiers and the
/// raw wire timestamp (`"{user}-{document}-{timestamp}"`), so a redelivered
/// frame produces the same id and downstream consumers can deduplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Deterministic event identifier.
    pub id: String,
    /// Event timestamp in UTC.
    pub timestamp: DateTime<Utc>,
    /// Who triggered the event.
    pub actor: Actor,
    /// Which document the event is about.
    pub subject: Subject,
}

impl NotificationEvent {
    /// Derive the deterministic event id from source identifiers and the raw
    /// wire timestamp string.
    #[must_use]
    pub fn derive_id(user_id: &str, document_id: &str, raw_timestamp: &str) -> String {
        format!("{user_id}-{document_id}-{raw_timestamp}")
    }
}
