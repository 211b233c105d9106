//! Handlers for the newsroom ingest collaborator.
//!
//! Change-sets are validated here and again by the engine; a rejected
//! change-set never takes a lock.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use onair_core::ids::{PlaylistId, RundownId, SegmentId, StudioId};
use onair_core::ingest::{IngestRundown, IngestSegment};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MoveRundownRequest {
    /// Target playlist. A new playlist is created when absent.
    pub into_playlist_id: Option<PlaylistId>,
    /// Desired rundown order in the target. Rundowns not listed keep
    /// their relative order after the listed ones.
    #[serde(default)]
    pub order: Vec<RundownId>,
}

#[derive(Debug, Serialize)]
pub struct RundownResponse {
    pub rundown_id: RundownId,
}

#[derive(Debug, Serialize)]
pub struct SegmentResponse {
    pub segment_id: SegmentId,
}

#[derive(Debug, Serialize)]
pub struct MoveRundownResponse {
    pub playlist_id: PlaylistId,
}

/// POST /api/v1/studios/{id}/rundowns
pub async fn upsert_rundown(
    State(state): State<AppState>,
    Path(studio_id): Path<StudioId>,
    Json(input): Json<IngestRundown>,
) -> AppResult<Json<DataResponse<RundownResponse>>> {
    input.validate()?;
    let rundown_id = state.engine.upsert_rundown(&studio_id, input).await?;
    Ok(DataResponse::new(RundownResponse { rundown_id }))
}

/// DELETE /api/v1/rundowns/{id}
pub async fn remove_rundown(
    State(state): State<AppState>,
    Path(id): Path<RundownId>,
) -> AppResult<StatusCode> {
    state.engine.remove_rundown(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/rundowns/{id}/segments
pub async fn upsert_segment(
    State(state): State<AppState>,
    Path(id): Path<RundownId>,
    Json(input): Json<IngestSegment>,
) -> AppResult<Json<DataResponse<SegmentResponse>>> {
    input.validate()?;
    let segment_id = state.engine.upsert_segment(&id, input).await?;
    Ok(DataResponse::new(SegmentResponse { segment_id }))
}

/// DELETE /api/v1/rundowns/{id}/segments/{segment_external_id}
pub async fn remove_segment(
    State(state): State<AppState>,
    Path((id, segment_external_id)): Path<(RundownId, String)>,
) -> AppResult<StatusCode> {
    state.engine.remove_segment(&id, &segment_external_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/rundowns/{id}/move
pub async fn move_rundown(
    State(state): State<AppState>,
    Path(id): Path<RundownId>,
    Json(input): Json<MoveRundownRequest>,
) -> AppResult<Json<DataResponse<MoveRundownResponse>>> {
    let playlist_id = state
        .engine
        .move_rundown(&id, input.into_playlist_id, input.order)
        .await?;
    Ok(DataResponse::new(MoveRundownResponse { playlist_id }))
}
