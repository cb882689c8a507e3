//! Connection Manager
//!
//! Owns the single physical WebSocket connection to the notification
//! service. All lifecycle transitions happen inside one connection task per
//! session; the manager itself only spawns, cancels, and observes that task,
//! so every public method returns immediately and tolerates being called
//! from any context (duplicate `connect()` calls degrade to no-ops instead
//! of creating duplicate transports).
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> Connecting -> Open -> Closed -> Connecting (retry) -> ... -> Open
//! ```
//!
//! `disconnect()` is reachable from any state and forces a terminal `Closed`
//! that schedules no further retries.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::codec::JsonCodec;
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::infrastructure::dispatch::{NOTIFICATION_TOPIC, NotificationDispatcher};

/// Lifecycle state of the notification connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection has been requested yet.
    Idle,
    /// A connection attempt is in flight.
    Connecting,
    /// The transport is open and frames are flowing.
    Open,
    /// An explicit teardown is in progress.
    Closing,
    /// The connection is down (explicitly, or between/after retries).
    Closed,
}

impl ConnectionState {
    /// Get the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

/// Errors internal to the connection task.
///
/// These never surface to callers; they feed the reconnection policy and the
/// logs.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// WebSocket error (includes failed connection attempts).
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server closed the connection or the stream ended.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Configuration for the connection manager.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL of the notification channel.
    pub url: String,
    /// Reconnection configuration.
    pub reconnect: ReconnectConfig,
}

/// Connection state shared between the manager and its connection task.
///
/// Writes carry the session number they belong to; a write from a session
/// that is no longer current is ignored. This keeps the task as the single
/// writer for its own session while letting `disconnect()` settle the state
/// synchronously without racing a task that has not yet observed its
/// cancellation.
#[derive(Debug)]
struct ConnectionStatus {
    inner: Mutex<(u64, ConnectionState)>,
}

impl ConnectionStatus {
    fn new() -> Self {
        Self {
            inner: Mutex::new((0, ConnectionState::Idle)),
        }
    }

    fn get(&self) -> ConnectionState {
        self.inner.lock().1
    }

    /// Start a new session in `Connecting`; returns the session number.
    fn begin_session(&self) -> u64 {
        let mut guard = self.inner.lock();
        guard.0 += 1;
        guard.1 = ConnectionState::Connecting;
        guard.0
    }

    /// Record a transition for `session`; ignored if the session is stale.
    fn set(&self, session: u64, state: ConnectionState) {
        let mut guard = self.inner.lock();
        if guard.0 == session {
            guard.1 = state;
        }
    }

    /// Force a transition, invalidating any in-flight session's writes.
    fn force(&self, state: ConnectionState) {
        let mut guard = self.inner.lock();
        guard.0 += 1;
        guard.1 = state;
    }
}

struct ManagerInner {
    cancel: Option<CancellationToken>,
    outbound: Option<mpsc::UnboundedSender<serde_json::Value>>,
}

/// Manages the single WebSocket connection to the notification service.
///
/// Decoded events are handed to the [`NotificationDispatcher`] under the
/// `"notification"` topic.
pub struct ConnectionManager {
    config: ConnectionConfig,
    dispatcher: NotificationDispatcher,
    status: Arc<ConnectionStatus>,
    inner: Mutex<ManagerInner>,
}

impl ConnectionManager {
    /// Create a new, idle connection manager.
    #[must_use]
    pub fn new(config: ConnectionConfig, dispatcher: NotificationDispatcher) -> Self {
        Self {
            config,
            dispatcher,
            status: Arc::new(ConnectionStatus::new()),
            inner: Mutex::new(ManagerInner {
                cancel: None,
                outbound: None,
            }),
        }
    }

    /// Open the connection.
    ///
    /// Idempotent: a call while a connection is open or being established is
    /// ignored, so duplicate triggers (an app-foreground hook firing twice)
    /// never create a second transport. Must be called from within a tokio
    /// runtime; returns immediately, with the connection established
    /// asynchronously.
    pub fn connect(&self) {
        let mut inner = self.inner.lock();

        match self.status.get() {
            ConnectionState::Connecting | ConnectionState::Open => {
                tracing::debug!(
                    state = self.status.get().as_str(),
                    "connect ignored; connection already active"
                );
                return;
            }
            ConnectionState::Idle | ConnectionState::Closing | ConnectionState::Closed => {}
        }

        // A previous session may still be sleeping between retries.
        if let Some(stale) = inner.cancel.take() {
            stale.cancel();
        }

        let session = self.status.begin_session();
        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let task = ConnectionTask {
            url: self.config.url.clone(),
            codec: JsonCodec::new(),
            reconnect: self.config.reconnect.clone(),
            dispatcher: self.dispatcher.clone(),
            status: Arc::clone(&self.status),
            session,
            cancel: cancel.clone(),
            outbound_rx,
        };

        inner.cancel = Some(cancel);
        inner.outbound = Some(outbound_tx);
        drop(tokio::spawn(task.run()));
    }

    /// Tear the connection down and cancel any pending retry or throttled
    /// flush. Idempotent and safe to call when already disconnected.
    pub fn disconnect(&self) {
        let mut inner = self.inner.lock();
        inner.outbound = None;

        if let Some(cancel) = inner.cancel.take() {
            self.status.force(ConnectionState::Closing);
            cancel.cancel();
        }

        self.status.force(ConnectionState::Closed);
        self.dispatcher.clear_pending();
    }

    /// Check whether the transport is currently open. Side-effect free.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status.get() == ConnectionState::Open
    }

    /// Get the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.status.get()
    }

    /// Send a JSON payload to the server, best-effort.
    ///
    /// Silently dropped when the connection is not open; outbound traffic on
    /// this channel is telemetry, not guaranteed delivery.
    pub fn send(&self, payload: serde_json::Value) {
        if !self.is_connected() {
            tracing::debug!("dropping outbound payload; connection not open");
            return;
        }

        let inner = self.inner.lock();
        if let Some(tx) = &inner.outbound
            && tx.send(payload).is_err()
        {
            tracing::debug!("dropping outbound payload; connection task gone");
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.config.url)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(cancel) = self.inner.get_mut().cancel.take() {
            cancel.cancel();
        }
    }
}

/// One session of the connection lifecycle: connect, pump frames, reconnect
/// on loss until cancelled or the retry budget runs out.
struct ConnectionTask {
    url: String,
    codec: JsonCodec,
    reconnect: ReconnectConfig,
    dispatcher: NotificationDispatcher,
    status: Arc<ConnectionStatus>,
    session: u64,
    cancel: CancellationToken,
    outbound_rx: mpsc::UnboundedReceiver<serde_json::Value>,
}

impl ConnectionTask {
    async fn run(mut self) {
        let mut policy = ReconnectPolicy::new(self.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                self.status.set(self.session, ConnectionState::Closed);
                return;
            }

            match self.connect_and_run(&mut policy).await {
                Ok(()) => {
                    // Cancelled mid-session; teardown already under way.
                    self.status.set(self.session, ConnectionState::Closed);
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "notification stream connection lost");
                    self.status.set(self.session, ConnectionState::Closed);
                    // Buffered-but-unflushed events do not leak across a
                    // reconnect boundary.
                    self.dispatcher.clear_pending();

                    let Some(delay) = policy.next_delay() else {
                        tracing::warn!(
                            attempts = policy.attempt_count(),
                            "reconnect budget exhausted; staying disconnected"
                        );
                        return;
                    };

                    tracing::info!(
                        attempt = policy.attempt_count(),
                        delay_ms = delay.as_millis() as u64,
                        "reconnecting to notification stream"
                    );

                    tokio::select! {
                        () = self.cancel.cancelled() => return,
                        () = tokio::time::sleep(delay) => {}
                    }

                    self.status.set(self.session, ConnectionState::Connecting);
                }
            }
        }
    }

    /// Connect and pump frames until cancellation (`Ok`) or connection loss
    /// (`Err`).
    async fn connect_and_run(&mut self, policy: &mut ReconnectPolicy) -> Result<(), ClientError> {
        tracing::info!(url = %self.url, "connecting to notification stream");

        let connect = tokio_tungstenite::connect_async(self.url.as_str());
        let (ws_stream, _response) = tokio::select! {
            () = self.cancel.cancelled() => return Ok(()),
            res = connect => res?,
        };

        self.status.set(self.session, ConnectionState::Open);
        policy.reset();
        tracing::info!("notification stream open");

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                payload = self.outbound_rx.recv() => {
                    match payload {
                        Some(value) => {
                            match serde_json::to_string(&value) {
                                Ok(text) => write.send(Message::Text(text.into())).await?,
                                Err(e) => {
                                    tracing::warn!(error = %e, "dropping unserializable outbound payload");
                                }
                            }
                        }
                        None => {
                            // Manager released the channel; treat as teardown.
                            let _ = write.send(Message::Close(None)).await;
                            return Ok(());
                        }
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_frame(text.as_str()),
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("server sent close frame");
                            return Err(ClientError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {
                            // Binary and pong frames are not part of the
                            // notification protocol.
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            tracing::info!("notification stream ended");
                            return Err(ClientError::ConnectionClosed);
                        }
                    }
                }
            }
        }
    }

    /// Best-effort decode of an inbound frame.
    ///
    /// A malformed frame is logged and dropped; it must never change
    /// connection state or stall the stream.
    fn handle_frame(&self, text: &str) {
        match self.codec.decode(text) {
            Ok(event) => self.dispatcher.publish(NOTIFICATION_TOPIC, event),
            Err(e) => tracing::warn!(error = %e, "ignoring undecodable notification frame"),
        }
    }
}
