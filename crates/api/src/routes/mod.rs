pub mod devices;
pub mod health;
pub mod playlists;
pub mod rundowns;
pub mod studios;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                              change feed (WebSocket)
///
/// /playlists/{id}                                  read model
/// /playlists/{id}/activate                         activate (POST)
/// /playlists/{id}/prepare                          prepare for broadcast (POST)
/// /playlists/{id}/deactivate                       deactivate (POST)
/// /playlists/{id}/reset                            reset (POST)
/// /playlists/{id}/take                             take (POST)
/// /playlists/{id}/next                             set next (POST)
/// /playlists/{id}/move-next                        move next (POST)
/// /playlists/{id}/adlib                            start ad-lib (POST)
/// /playlists/{id}/restore-order                    restore rundown order (POST)
///
/// /studios/{id}/rundowns                           ingest rundown (POST)
/// /studios/{id}/timeline                           current timeline
///
/// /rundowns/{id}                                   remove (DELETE)
/// /rundowns/{id}/segments                          ingest segment (PUT)
/// /rundowns/{id}/segments/{segment_external_id}    remove segment (DELETE)
/// /rundowns/{id}/move                              move to playlist (POST)
///
/// /devices/playback-changed                        playback report (POST)
/// /devices/resolve-done                            resolve telemetry (POST)
/// /devices/trigger-time                            trigger telemetry (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/playlists", playlists::router())
        .nest("/studios", studios::router())
        .nest("/rundowns", rundowns::router())
        .nest("/devices", devices::router())
}
