//! Notification Dispatcher
//!
//! Topic-keyed fan-out of decoded notification events to in-process
//! subscribers, with an optional throttled delivery mode that batches bursts
//! into a single flush per window.
//!
//! Handlers are opaque closures. The dispatcher snapshots the registered
//! handlers before invoking them, so a handler may subscribe or cancel
//! during delivery without deadlocking; such changes apply to later
//! publishes only. A throttled batch is delivered entirely against the
//! snapshot taken when its flush starts. A panicking handler is isolated
//! and never takes down the connection task.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::domain::notification::NotificationEvent;
use crate::infrastructure::config::{DeliveryMode, DispatchSettings};

/// Topic that inbound document notifications are published under.
pub const NOTIFICATION_TOPIC: &str = "notification";

/// Wildcard topic whose subscribers receive events from every topic.
pub const WILDCARD_TOPIC: &str = "*";

/// Subscriber callback invoked once per delivered event.
pub type Handler = Arc<dyn Fn(NotificationEvent) + Send + Sync>;

/// Configuration for the notification dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Whether events are delivered immediately or batched.
    pub mode: DeliveryMode,
    /// Buffering window used in [`DeliveryMode::Throttled`].
    pub throttle_window: Duration,
}

impl DispatchConfig {
    /// Build from dispatch settings.
    #[must_use]
    pub const fn from_settings(settings: &DispatchSettings) -> Self {
        Self {
            mode: settings.mode,
            throttle_window: settings.throttle_window,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::from_settings(&DispatchSettings::default())
    }
}

/// Cancels one subscription.
///
/// Cancellation is identity-based and idempotent: cancelling twice, or
/// cancelling after the dispatcher is gone, is a no-op, and never affects
/// another subscription registered for the same topic (even one registered
/// with an identical closure).
pub struct SubscriptionHandle {
    inner: Weak<DispatchInner>,
    topic: String,
    id: u64,
}

impl SubscriptionHandle {
    /// Remove the subscription from the registry.
    pub fn cancel(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.unsubscribe(&self.topic, self.id);
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .finish()
    }
}

/// Pending throttled events plus the timer for the current window.
///
/// Invariant: `flush` is `Some` exactly while `buffer` is non-empty and no
/// flush has fired for it yet.
#[derive(Default)]
struct ThrottleState {
    buffer: Vec<(String, NotificationEvent)>,
    flush: Option<JoinHandle<()>>,
}

struct DispatchInner {
    config: DispatchConfig,
    next_id: AtomicU64,
    registry: Mutex<HashMap<String, Vec<(u64, Handler)>>>,
    pending: Mutex<ThrottleState>,
}

impl DispatchInner {
    fn unsubscribe(&self, topic: &str, id: u64) {
        let mut registry = self.registry.lock();
        if let Some(handlers) = registry.get_mut(topic) {
            handlers.retain(|(handler_id, _)| *handler_id != id);
            if handlers.is_empty() {
                registry.remove(topic);
            }
        }
    }

    /// Snapshot the handlers for one topic (plus the wildcard subscribers),
    /// in registration order.
    fn snapshot(&self, topic: &str) -> Vec<Handler> {
        let registry = self.registry.lock();
        let mut snapshot = Vec::new();
        if let Some(entries) = registry.get(topic) {
            snapshot.extend(entries.iter().map(|(_, h)| Arc::clone(h)));
        }
        if topic != WILDCARD_TOPIC
            && let Some(entries) = registry.get(WILDCARD_TOPIC)
        {
            snapshot.extend(entries.iter().map(|(_, h)| Arc::clone(h)));
        }
        snapshot
    }

    fn invoke(topic: &str, handlers: &[Handler], event: &NotificationEvent) {
        for handler in handlers {
            let handler = Arc::clone(handler);
            let event = event.clone();
            if catch_unwind(AssertUnwindSafe(move || handler(event))).is_err() {
                tracing::error!(topic, "notification handler panicked");
            }
        }
    }

    /// Deliver one event to the topic's subscribers and the wildcard
    /// subscribers, in registration order.
    fn deliver(&self, topic: &str, event: &NotificationEvent) {
        Self::invoke(topic, &self.snapshot(topic), event);
    }

    /// Drain and deliver the throttled buffer, oldest first.
    ///
    /// Handler snapshots are captured per topic before the first event goes
    /// out, so registry changes made by a handler mid-batch (subscribing,
    /// cancelling) only apply to later publishes, never to the batch being
    /// iterated.
    fn flush_pending(&self) {
        let drained = {
            let mut pending = self.pending.lock();
            pending.flush = None;
            std::mem::take(&mut pending.buffer)
        };

        if drained.is_empty() {
            return;
        }

        let mut snapshots: HashMap<&str, Vec<Handler>> = HashMap::new();
        for (topic, _) in &drained {
            snapshots
                .entry(topic.as_str())
                .or_insert_with(|| self.snapshot(topic));
        }

        tracing::debug!(count = drained.len(), "flushing throttled notifications");
        for (topic, event) in &drained {
            if let Some(handlers) = snapshots.get(topic.as_str()) {
                Self::invoke(topic, handlers, event);
            }
        }
    }
}

/// Fan-out registry for decoded notification events.
///
/// Cheap to clone; all clones share one registry and one throttle buffer.
#[derive(Clone)]
pub struct NotificationDispatcher {
    inner: Arc<DispatchInner>,
}

impl NotificationDispatcher {
    /// Create a dispatcher with the given delivery configuration.
    #[must_use]
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            inner: Arc::new(DispatchInner {
                config,
                next_id: AtomicU64::new(0),
                registry: Mutex::new(HashMap::new()),
                pending: Mutex::new(ThrottleState::default()),
            }),
        }
    }

    /// Register `handler` for events published under `topic`.
    ///
    /// Subscribing to [`WILDCARD_TOPIC`] receives events from every topic.
    /// The returned handle cancels exactly this registration.
    pub fn subscribe(
        &self,
        topic: impl Into<String>,
        handler: impl Fn(NotificationEvent) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let topic = topic.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner
            .registry
            .lock()
            .entry(topic.clone())
            .or_default()
            .push((id, Arc::new(handler)));

        SubscriptionHandle {
            inner: Arc::downgrade(&self.inner),
            topic,
            id,
        }
    }

    /// Publish one event under `topic`.
    ///
    /// In [`DeliveryMode::Immediate`] the event is delivered synchronously.
    /// In [`DeliveryMode::Throttled`] it is buffered; the first event of a
    /// window arms a single flush timer, and every event buffered before
    /// that timer fires is delivered in the same flush, oldest first.
    pub fn publish(&self, topic: &str, event: NotificationEvent) {
        match self.inner.config.mode {
            DeliveryMode::Immediate => self.inner.deliver(topic, &event),
            DeliveryMode::Throttled => self.buffer(topic, event),
        }
    }

    fn buffer(&self, topic: &str, event: NotificationEvent) {
        let mut pending = self.inner.pending.lock();
        pending.buffer.push((topic.to_owned(), event));

        if pending.flush.is_none() {
            let window = self.inner.config.throttle_window;
            let inner = Arc::clone(&self.inner);
            pending.flush = Some(tokio::spawn(async move {
                tokio::time::sleep(window).await;
                inner.flush_pending();
            }));
        }
    }

    /// Drop all buffered events and disarm the flush timer.
    ///
    /// Called at disconnect and at each reconnect boundary so events from a
    /// previous connection never surface on a later one.
    pub fn clear_pending(&self) {
        let mut pending = self.inner.pending.lock();
        if let Some(flush) = pending.flush.take() {
            flush.abort();
        }
        if !pending.buffer.is_empty() {
            tracing::debug!(
                count = pending.buffer.len(),
                "discarding buffered notifications"
            );
            pending.buffer.clear();
        }
    }

    /// Number of events currently buffered for a throttled flush.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().buffer.len()
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("config", &self.inner.config)
            .field("pending", &self.pending_count())
            .finish()
    }
}
