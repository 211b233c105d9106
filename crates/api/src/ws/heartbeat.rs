//! Keep-alive pings for change-feed subscribers.
//!
//! Idle feeds are otherwise closed by proxies between the studio and the
//! server. The period is `WS_HEARTBEAT_SECS` from [`ServerConfig`].
//!
//! [`ServerConfig`]: crate::config::ServerConfig

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ws::manager::WsManager;

/// Spawn the ping loop. It stops when `cancel` fires.
pub fn start_heartbeat(
    ws_manager: Arc<WsManager>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately; nobody needs a ping yet.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let subscribers = ws_manager.connection_count().await;
                    if subscribers == 0 {
                        continue;
                    }
                    tracing::trace!(subscribers, "Pinging feed subscribers");
                    ws_manager.ping_all().await;
                }
            }
        }
        tracing::debug!("Feed heartbeat stopped");
    })
}
