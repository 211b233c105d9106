//! Handlers for device-gateway callbacks.
//!
//! Playback reports feed the take state machine. Resolve and trigger
//! reports are telemetry only.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use onair_core::ids::{PlaylistId, StudioId};
use onair_core::playback::{PlayoutChange, TriggerTimeResult};
use onair_playout::ResolveLatency;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlaybackChangedRequest {
    pub playlist_id: PlaylistId,
    pub changes: Vec<PlayoutChange>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveDoneRequest {
    pub studio_id: StudioId,
    pub timeline_hash: String,
    pub resolve_duration_ms: i64,
}

#[derive(Debug, Deserialize)]
pub struct TriggerTimeRequest {
    pub studio_id: StudioId,
    pub results: Vec<TriggerTimeResult>,
}

/// POST /api/v1/devices/playback-changed
pub async fn playback_changed(
    State(state): State<AppState>,
    Json(input): Json<PlaybackChangedRequest>,
) -> AppResult<StatusCode> {
    state
        .engine
        .on_playout_playback_changed(&input.playlist_id, input.changes)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/devices/resolve-done
///
/// `data` is `null` when the reported hash is not the stored timeline's.
pub async fn resolve_done(
    State(state): State<AppState>,
    Json(input): Json<ResolveDoneRequest>,
) -> AppResult<Json<DataResponse<Option<ResolveLatency>>>> {
    let latency = state
        .engine
        .report_resolve_done(&input.studio_id, &input.timeline_hash, input.resolve_duration_ms)
        .await?;
    Ok(DataResponse::new(latency))
}

/// POST /api/v1/devices/trigger-time
pub async fn trigger_time(
    State(state): State<AppState>,
    Json(input): Json<TriggerTimeRequest>,
) -> StatusCode {
    state.engine.timeline_trigger_time(&input.studio_id, &input.results);
    StatusCode::NO_CONTENT
}
