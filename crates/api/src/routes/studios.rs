use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{ingest, studios};
use crate::state::AppState;

/// Routes mounted at `/studios`.
///
/// ```text
/// POST   /{id}/rundowns   -> ingest::upsert_rundown
/// GET    /{id}/timeline   -> get_timeline
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/rundowns", post(ingest::upsert_rundown))
        .route("/{id}/timeline", get(studios::get_timeline))
}
