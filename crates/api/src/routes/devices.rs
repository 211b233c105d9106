use axum::routing::post;
use axum::Router;

use crate::handlers::devices;
use crate::state::AppState;

/// Routes mounted at `/devices`, called by device gateways.
///
/// ```text
/// POST   /playback-changed   -> playback_changed
/// POST   /resolve-done       -> resolve_done
/// POST   /trigger-time       -> trigger_time
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/playback-changed", post(devices::playback_changed))
        .route("/resolve-done", post(devices::resolve_done))
        .route("/trigger-time", post(devices::trigger_time))
}
