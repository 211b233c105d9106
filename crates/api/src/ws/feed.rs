//! Forwards engine events to WebSocket subscribers.

use std::sync::Arc;

use onair_events::PlayoutEvent;
use tokio::sync::broadcast;

use crate::ws::manager::WsManager;

/// Forward events until the bus closes.
pub async fn run_feed(ws_manager: Arc<WsManager>, mut receiver: broadcast::Receiver<PlayoutEvent>) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                let delivered = ws_manager.publish(&event).await;
                tracing::trace!(event_type = %event.event_type, delivered, "Event forwarded");
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Change feed lagged, events skipped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!("Event bus closed, change feed shutting down");
                break;
            }
        }
    }
}
