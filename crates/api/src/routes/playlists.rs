//! Route definitions for the `/playlists` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::playlists;
use crate::state::AppState;

/// Routes mounted at `/playlists`.
///
/// ```text
/// GET    /{id}                 -> get_playlist
/// POST   /{id}/activate        -> activate
/// POST   /{id}/prepare         -> prepare
/// POST   /{id}/deactivate      -> deactivate
/// POST   /{id}/reset           -> reset
/// POST   /{id}/take            -> take
/// POST   /{id}/next            -> set_next
/// POST   /{id}/move-next       -> move_next
/// POST   /{id}/adlib           -> adlib
/// POST   /{id}/restore-order   -> restore_order
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(playlists::get_playlist))
        .route("/{id}/activate", post(playlists::activate))
        .route("/{id}/prepare", post(playlists::prepare))
        .route("/{id}/deactivate", post(playlists::deactivate))
        .route("/{id}/reset", post(playlists::reset))
        .route("/{id}/take", post(playlists::take))
        .route("/{id}/next", post(playlists::set_next))
        .route("/{id}/move-next", post(playlists::move_next))
        .route("/{id}/adlib", post(playlists::adlib))
        .route("/{id}/restore-order", post(playlists::restore_order))
}
