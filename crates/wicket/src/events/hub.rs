//! In-memory event hub keyed by session id.

use dashmap::DashMap;
use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use super::types::SessionEvent;

/// Size of a subscriber's event buffer.
const CHANNEL_BUFFER_SIZE: usize = 64;

/// A live subscription: the receiving end of the channel plus the token
/// identifying this particular subscriber in the registry.
pub struct Subscription {
    /// Token handed back to [`EventHub::disconnect`] on transport close.
    pub token: u64,
    /// Stream of events for this session.
    pub receiver: mpsc::Receiver<SessionEvent>,
}

struct Channel {
    token: u64,
    tx: mpsc::Sender<SessionEvent>,
}

/// Registry of live observer channels, at most one per session.
///
/// A second subscribe for the same session replaces the registry entry,
/// which ends the prior subscriber's stream. Publishing to a session nobody
/// watches is a silent no-op; there is no queue or replay. The hub is
/// constructed once at startup and handed to handlers through application
/// state.
pub struct EventHub {
    channels: DashMap<i64, Channel>,
    next_token: AtomicU64,
}

impl EventHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            next_token: AtomicU64::new(1),
        }
    }

    /// Open a channel for a session, replacing any existing one.
    ///
    /// The new subscriber immediately receives a `control` event with an
    /// `initialize` payload.
    pub fn subscribe(&self, session_id: i64) -> Subscription {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);

        if self
            .channels
            .insert(session_id, Channel { token, tx })
            .is_some()
        {
            debug!("Replaced existing event channel for session {}", session_id);
        }
        info!("Observer subscribed to session {} events", session_id);

        self.publish(session_id, SessionEvent::control("initialize"));

        Subscription {
            token,
            receiver: rx,
        }
    }

    /// Publish an event to a session's subscriber, if any.
    ///
    /// Best-effort: without a subscriber the event is dropped, and a full
    /// channel drops the event rather than blocking the caller.
    pub fn publish(&self, session_id: i64, event: SessionEvent) {
        let Some(channel) = self.channels.get(&session_id) else {
            debug!("No subscriber for session {}, dropping event", session_id);
            return;
        };
        if let Err(err) = channel.tx.try_send(event) {
            debug!("Dropping event for session {}: {}", session_id, err);
        }
    }

    /// Remove a session's channel. Dropping the sender signals end-of-stream
    /// to the subscriber.
    pub fn unsubscribe(&self, session_id: i64) {
        if self.channels.remove(&session_id).is_some() {
            info!("Removed event channel for session {}", session_id);
        }
    }

    /// Transport-close path: publish the terminal `control`/`end` event into
    /// the closing channel, then remove it.
    ///
    /// Guarded by `token` so that a replaced subscriber's late close cannot
    /// tear down its successor's channel.
    pub fn disconnect(&self, session_id: i64, token: u64) {
        let removed = self
            .channels
            .remove_if(&session_id, |_, channel| channel.token == token);

        match removed {
            Some((_, channel)) => {
                // The subscriber is usually gone by now; a failed send is fine.
                let _ = channel.tx.try_send(SessionEvent::control("end"));
                info!("Observer disconnected from session {} events", session_id);
            }
            None => {
                debug!(
                    "Stale disconnect for session {} ignored (channel was replaced)",
                    session_id
                );
            }
        }
    }

    /// Session-teardown path: publish `control`/`end`, then unsubscribe,
    /// regardless of which subscriber currently owns the channel.
    pub fn close(&self, session_id: i64) {
        self.publish(session_id, SessionEvent::control("end"));
        self.unsubscribe(session_id);
    }

    /// Whether a subscriber is currently registered for the session.
    pub fn has_subscriber(&self, session_id: i64) -> bool {
        self.channels.contains_key(&session_id)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_without_subscriber_is_noop() {
        let hub = EventHub::new();
        hub.publish(1, SessionEvent::lrs("get", "statements"));
        assert!(!hub.has_subscriber(1));
    }

    #[tokio::test]
    async fn test_subscribe_receives_initialize_first() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe(7);

        let event = sub.receiver.recv().await.unwrap();
        assert_eq!(event.name.as_deref(), Some("control"));
        assert_eq!(event.data, json!({ "kind": "initialize" }));
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe(7);
        sub.receiver.recv().await.unwrap();

        hub.publish(7, SessionEvent::lrs("post", "statements"));
        let event = sub.receiver.recv().await.unwrap();
        assert_eq!(event.data["kind"], "lrs");
        assert_eq!(event.data["method"], "post");
    }

    #[tokio::test]
    async fn test_second_subscribe_replaces_first() {
        let hub = EventHub::new();
        let mut first = hub.subscribe(7);
        first.receiver.recv().await.unwrap();

        let mut second = hub.subscribe(7);
        second.receiver.recv().await.unwrap();

        // The first channel's sender was dropped by the replacement.
        assert!(first.receiver.recv().await.is_none());

        hub.publish(7, SessionEvent::fetch_status(200));
        let event = second.receiver.recv().await.unwrap();
        assert_eq!(event.data["kind"], "fetch");
        assert!(hub.has_subscriber(7));
    }

    #[tokio::test]
    async fn test_disconnect_publishes_end_and_removes() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe(7);
        sub.receiver.recv().await.unwrap();

        hub.disconnect(7, sub.token);

        let event = sub.receiver.recv().await.unwrap();
        assert_eq!(event.name.as_deref(), Some("control"));
        assert_eq!(event.data, json!({ "kind": "end" }));
        assert!(sub.receiver.recv().await.is_none());
        assert!(!hub.has_subscriber(7));

        // Subsequent publishes are no-ops.
        hub.publish(7, SessionEvent::fetch_status(200));
        assert!(!hub.has_subscriber(7));
    }

    #[tokio::test]
    async fn test_stale_disconnect_keeps_replacement() {
        let hub = EventHub::new();
        let first = hub.subscribe(7);
        let mut second = hub.subscribe(7);
        second.receiver.recv().await.unwrap();

        // The replaced subscriber's close must not tear down its successor.
        hub.disconnect(7, first.token);
        assert!(hub.has_subscriber(7));

        hub.publish(7, SessionEvent::lrs("get", "about"));
        let event = second.receiver.recv().await.unwrap();
        assert_eq!(event.data["resource"], "about");
    }

    #[tokio::test]
    async fn test_close_ends_stream() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe(7);
        sub.receiver.recv().await.unwrap();

        hub.close(7);

        let event = sub.receiver.recv().await.unwrap();
        assert_eq!(event.data, json!({ "kind": "end" }));
        assert!(sub.receiver.recv().await.is_none());
        assert!(!hub.has_subscriber(7));
    }
}
