//! Route definitions for the `/rundowns` resource.

use axum::routing::{delete, post, put};
use axum::Router;

use crate::handlers::ingest;
use crate::state::AppState;

/// Routes mounted at `/rundowns`.
///
/// ```text
/// DELETE /{id}                                  -> remove_rundown
/// PUT    /{id}/segments                         -> upsert_segment
/// DELETE /{id}/segments/{segment_external_id}   -> remove_segment
/// POST   /{id}/move                             -> move_rundown
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", delete(ingest::remove_rundown))
        .route("/{id}/segments", put(ingest::upsert_segment))
        .route(
            "/{id}/segments/{segment_external_id}",
            delete(ingest::remove_segment),
        )
        .route("/{id}/move", post(ingest::move_rundown))
}
