use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use onair_core::ids::{PlaylistId, StudioId};
use onair_core::types::Timestamp;
use onair_events::PlayoutEvent;
use serde::Deserialize;
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Which events a connection wants. Empty means everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Subscription {
    pub playlist_id: Option<PlaylistId>,
    pub studio_id: Option<StudioId>,
}

impl Subscription {
    pub fn matches(&self, event: &PlayoutEvent) -> bool {
        let playlist_ok = self
            .playlist_id
            .as_ref()
            .is_none_or(|id| event.playlist_id.as_ref() == Some(id));
        let studio_ok = self
            .studio_id
            .as_ref()
            .is_none_or(|id| event.studio_id.as_ref() == Some(id));
        playlist_ok && studio_ok
    }
}

pub struct WsConnection {
    pub subscription: Subscription,
    pub sender: WsSender,
    pub connected_at: Timestamp,
}

/// Manages all active WebSocket connections.
///
/// Thread-safe via interior `RwLock`; wrapped in `Arc` and shared across
/// the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(
        &self,
        conn_id: String,
        subscription: Subscription,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            subscription,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Replace the subscription of a connection. Returns false if it is gone.
    pub async fn resubscribe(&self, conn_id: &str, subscription: Subscription) -> bool {
        match self.connections.write().await.get_mut(conn_id) {
            Some(conn) => {
                conn.subscription = subscription;
                true
            }
            None => false,
        }
    }

    /// Send an event to every connection whose subscription matches.
    ///
    /// Returns the number of connections the event was sent to. Closed
    /// channels are skipped; their receive loop cleans them up.
    pub async fn publish(&self, event: &PlayoutEvent) -> usize {
        let text = match serde_json::to_string(event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(event_type = %event.event_type, error = %e, "Failed to encode event");
                return 0;
            }
        };
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values().filter(|c| c.subscription.matches(event)) {
            if conn.sender.send(Message::Text(text.clone().into())).is_ok() {
                count += 1;
            }
        }
        count
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
