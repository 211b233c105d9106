//! The take/next state machine.
//!
//! Each public operation runs as one playlist job (see
//! [`JobContext::run_playlist_job`](crate::context::JobContext::run_playlist_job)).
//! The `*_in_cache` helpers hold the transitions themselves and are shared
//! between operations that compose them inside a single job.

mod activation;
mod adlib;
mod next;
mod playback;
mod take;

pub use activation::{
    activate, deactivate, prepare_for_broadcast, reset_playlist, ActivationMode, ResetOptions,
};
pub use adlib::{ad_lib_piece_start, AdlibOutcome};
pub use next::{move_next_part, set_next_part, NextTarget};
pub use playback::on_playout_playback_changed;
pub use take::{take_next_part, TakeOutcome};

pub(crate) use activation::{deactivate_in_cache, studio_of};
pub(crate) use next::{find_next_part, point_next, select_next_auto, set_next_in_cache};

use onair_core::error::{CoreError, CoreResult, UserErrorCode};
use onair_core::ids::ActivationId;
use onair_db::cache::PlayoutCache;

pub(crate) fn require_active(cache: &PlayoutCache) -> CoreResult<ActivationId> {
    cache.playlist().activation_id.clone().ok_or_else(|| {
        CoreError::user(
            UserErrorCode::InactiveRundown,
            format!("Playlist \"{}\" is not active", cache.playlist().name),
        )
    })
}
