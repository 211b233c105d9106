//! Handlers for the `/playlists` resource: operator actions and the read model.

use axum::extract::{Path, State};
use axum::Json;
use onair_core::ids::{ActivationId, AdLibPieceId, PartId, PartInstanceId, PlaylistId, RundownId};
use onair_playout::{AdlibOutcome, NextTarget, PlaylistView, ResetOptions, TakeOutcome};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ActivateRequest {
    #[serde(default)]
    pub rehearsal: bool,
    /// Deactivate other active playlists in the studio instead of failing.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct TakeRequest {
    /// The instance the operator saw as current; a mismatch is a conflict.
    pub from_part_instance_id: Option<PartInstanceId>,
}

#[derive(Debug, Deserialize)]
pub struct SetNextRequest {
    pub part_id: Option<PartId>,
    pub part_instance_id: Option<PartInstanceId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MoveNextRequest {
    #[serde(default)]
    pub part_delta: i32,
    #[serde(default)]
    pub segment_delta: i32,
}

#[derive(Debug, Deserialize)]
pub struct AdlibRequest {
    pub part_instance_id: PartInstanceId,
    pub adlib_piece_id: AdLibPieceId,
    #[serde(default)]
    pub queue: bool,
}

#[derive(Debug, Serialize)]
pub struct ActivationResponse {
    pub activation_id: Option<ActivationId>,
}

#[derive(Debug, Serialize)]
pub struct NextResponse {
    pub part_instance_id: PartInstanceId,
}

#[derive(Debug, Serialize)]
pub struct MoveNextResponse {
    pub part_id: Option<PartId>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub rundown_ids: Vec<RundownId>,
}

/// GET /api/v1/playlists/{id}
pub async fn get_playlist(
    State(state): State<AppState>,
    Path(id): Path<PlaylistId>,
) -> AppResult<Json<DataResponse<PlaylistView>>> {
    let view = state.engine.playlist_view(&id).await?;
    Ok(DataResponse::new(view))
}

/// POST /api/v1/playlists/{id}/activate
pub async fn activate(
    State(state): State<AppState>,
    Path(id): Path<PlaylistId>,
    Json(input): Json<ActivateRequest>,
) -> AppResult<Json<DataResponse<ActivationResponse>>> {
    let activation_id = state.engine.activate(&id, input.rehearsal, input.force).await?;
    Ok(DataResponse::new(ActivationResponse {
        activation_id: Some(activation_id),
    }))
}

/// POST /api/v1/playlists/{id}/prepare
///
/// Activates in rehearsal and asks the devices to get ready.
pub async fn prepare(
    State(state): State<AppState>,
    Path(id): Path<PlaylistId>,
) -> AppResult<Json<DataResponse<ActivationResponse>>> {
    let activation_id = state.engine.prepare_for_broadcast(&id).await?;
    Ok(DataResponse::new(ActivationResponse {
        activation_id: Some(activation_id),
    }))
}

/// POST /api/v1/playlists/{id}/deactivate
pub async fn deactivate(
    State(state): State<AppState>,
    Path(id): Path<PlaylistId>,
) -> AppResult<Json<DataResponse<ActivationResponse>>> {
    state.engine.deactivate(&id).await?;
    Ok(DataResponse::new(ActivationResponse { activation_id: None }))
}

/// POST /api/v1/playlists/{id}/reset
pub async fn reset(
    State(state): State<AppState>,
    Path(id): Path<PlaylistId>,
    Json(options): Json<ResetOptions>,
) -> AppResult<Json<DataResponse<ActivationResponse>>> {
    let activation_id = state.engine.reset_playlist(&id, options).await?;
    Ok(DataResponse::new(ActivationResponse { activation_id }))
}

/// POST /api/v1/playlists/{id}/take
pub async fn take(
    State(state): State<AppState>,
    Path(id): Path<PlaylistId>,
    Json(input): Json<TakeRequest>,
) -> AppResult<Json<DataResponse<TakeOutcome>>> {
    let outcome = state.engine.take_next_part(&id, input.from_part_instance_id).await?;
    Ok(DataResponse::new(outcome))
}

/// POST /api/v1/playlists/{id}/next
///
/// Exactly one of `part_id` and `part_instance_id` must be given.
pub async fn set_next(
    State(state): State<AppState>,
    Path(id): Path<PlaylistId>,
    Json(input): Json<SetNextRequest>,
) -> AppResult<Json<DataResponse<NextResponse>>> {
    let target = match (input.part_id, input.part_instance_id) {
        (Some(part_id), None) => NextTarget::Part(part_id),
        (None, Some(instance_id)) => NextTarget::PartInstance(instance_id),
        _ => {
            return Err(AppError::BadRequest(
                "Exactly one of part_id and part_instance_id is required".into(),
            ))
        }
    };
    let part_instance_id = state.engine.set_next_part(&id, target).await?;
    Ok(DataResponse::new(NextResponse { part_instance_id }))
}

/// POST /api/v1/playlists/{id}/move-next
pub async fn move_next(
    State(state): State<AppState>,
    Path(id): Path<PlaylistId>,
    Json(input): Json<MoveNextRequest>,
) -> AppResult<Json<DataResponse<MoveNextResponse>>> {
    let part_id = state
        .engine
        .move_next_part(&id, input.part_delta, input.segment_delta)
        .await?;
    Ok(DataResponse::new(MoveNextResponse { part_id }))
}

/// POST /api/v1/playlists/{id}/adlib
pub async fn adlib(
    State(state): State<AppState>,
    Path(id): Path<PlaylistId>,
    Json(input): Json<AdlibRequest>,
) -> AppResult<Json<DataResponse<AdlibOutcome>>> {
    let outcome = state
        .engine
        .ad_lib_piece_start(&id, input.part_instance_id, input.adlib_piece_id, input.queue)
        .await?;
    Ok(DataResponse::new(outcome))
}

/// POST /api/v1/playlists/{id}/restore-order
pub async fn restore_order(
    State(state): State<AppState>,
    Path(id): Path<PlaylistId>,
) -> AppResult<Json<DataResponse<OrderResponse>>> {
    let rundown_ids = state.engine.restore_rundown_order(&id).await?;
    Ok(DataResponse::new(OrderResponse { rundown_ids }))
}
