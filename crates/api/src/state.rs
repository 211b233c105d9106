use std::sync::Arc;

use onair_db::DocumentStore;
use onair_events::EventBus;
use onair_playout::PlayoutEngine;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is an `Arc` or wraps one.
#[derive(Clone)]
pub struct AppState {
    /// The playout engine. Every operation runs as its own job.
    pub engine: PlayoutEngine,
    /// Document store behind the engine, probed by the health check.
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (change feed subscribers).
    pub ws_manager: Arc<WsManager>,
    /// Bus the engine publishes change notifications on.
    pub event_bus: Arc<EventBus>,
}
