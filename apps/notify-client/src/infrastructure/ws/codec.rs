//! Wire Codec
//!
//! Decodes inbound notification frames from the server.
//!
//! # Wire Format (JSON, server to client)
//!
//! ```json
//! {
//!   "Timestamp": "2023-01-01T00:00:00Z",
//!   "UserID": "u1",
//!   "UserName": "Ann",
//!   "DocumentID": "d1",
//!   "DocumentTitle": "Roadmap"
//! }
//! ```
//!
//! Decoding produces a [`NotificationEvent`] whose id is derived from the
//! raw timestamp string, so the same frame always yields the same id.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::notification::{Actor, NotificationEvent, Subject};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// JSON decoding failed.
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// The `Timestamp` field is not valid ISO-8601.
    #[error("invalid timestamp {value:?}: {source}")]
    Timestamp {
        /// The raw timestamp value from the frame.
        value: String,
        /// Underlying parse failure.
        source: chrono::ParseError,
    },
}

/// Inbound wire frame as sent by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationFrame {
    /// ISO-8601 event timestamp.
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    /// Id of the user that triggered the event.
    #[serde(rename = "UserID")]
    pub user_id: String,
    /// Display name of the user.
    #[serde(rename = "UserName")]
    pub user_name: String,
    /// Id of the document the event refers to.
    #[serde(rename = "DocumentID")]
    pub document_id: String,
    /// Title of the document.
    #[serde(rename = "DocumentTitle")]
    pub document_title: String,
}

/// JSON codec for the notification stream.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a text frame into a [`NotificationEvent`].
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not valid JSON for the wire schema
    /// or carries an unparseable timestamp. Callers at the transport
    /// boundary swallow this error: a malformed frame must never terminate
    /// the connection.
    pub fn decode(&self, text: &str) -> Result<NotificationEvent, DecodeError> {
        let frame: NotificationFrame = serde_json::from_str(text)?;

        let timestamp = DateTime::parse_from_rfc3339(&frame.timestamp)
            .map_err(|source| DecodeError::Timestamp {
                value: frame.timestamp.clone(),
                source,
            })?
            .with_timezone(&Utc);

        Ok(NotificationEvent {
            id: NotificationEvent::derive_id(&frame.user_id, &frame.document_id, &frame.timestamp),
            timestamp,
            actor: Actor {
                id: frame.user_id,
                name: frame.user_name,
            },
            subject: Subject {
                id: frame.document_id,
                title: frame.document_title,
            },
        })
    }
}
