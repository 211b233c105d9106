//! In-process event bus backed by a `tokio::sync::broadcast` channel.

use chrono::Utc;
use onair_core::ids::{PlaylistId, StudioId};
use onair_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event names published by the engine.
pub mod event_types {
    /// A playlist's documents changed. Payload lists the collections.
    pub const PLAYLIST_CHANGED: &str = "playlist.changed";
    /// A studio timeline was regenerated. Payload is the timeline.
    pub const TIMELINE_UPDATED: &str = "timeline.updated";
    /// Gateways should prepare devices ahead of a show.
    pub const DEVICES_MAKE_READY: &str = "devices.make_ready";
    /// Round-trip latency measured from a gateway's resolve report.
    pub const DEVICE_LATENCY: &str = "device.latency";
}

// ---------------------------------------------------------------------------
// PlayoutEvent
// ---------------------------------------------------------------------------

/// Something observable happened to a studio or playlist.
///
/// Constructed via [`PlayoutEvent::new`] and enriched with the builder
/// methods [`with_studio`](PlayoutEvent::with_studio),
/// [`with_playlist`](PlayoutEvent::with_playlist) and
/// [`with_payload`](PlayoutEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayoutEvent {
    /// Dot-separated event name, e.g. `"timeline.updated"`.
    pub event_type: String,
    pub studio_id: Option<StudioId>,
    pub playlist_id: Option<PlaylistId>,
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl PlayoutEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            studio_id: None,
            playlist_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_studio(mut self, studio_id: StudioId) -> Self {
        self.studio_id = Some(studio_id);
        self
    }

    pub fn with_playlist(mut self, playlist_id: PlaylistId) -> Self {
        self.playlist_id = Some(playlist_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Stamp the event with engine time instead of wall-clock time.
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Slow receivers observe `RecvError::Lagged` once the buffer fills.
pub struct EventBus {
    sender: broadcast::Sender<PlayoutEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped if there are none.
    pub fn publish(&self, event: PlayoutEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayoutEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
