use axum::extract::{Path, State};
use axum::Json;
use onair_core::ids::StudioId;
use onair_core::timeline::TimelineComplete;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/studios/{id}/timeline
///
/// The studio's current timeline, or `null` before the first activation.
pub async fn get_timeline(
    State(state): State<AppState>,
    Path(id): Path<StudioId>,
) -> AppResult<Json<DataResponse<Option<TimelineComplete>>>> {
    let timeline = state.engine.studio_timeline(&id).await?;
    Ok(DataResponse::new(timeline))
}
