//! Take: the next part goes on air.

use onair_core::error::{CoreError, CoreResult, UserErrorCode};
use onair_core::ids::{ActivationId, PartInstanceId, PlaylistId};
use onair_core::types::Timestamp;
use onair_db::cache::PlayoutCache;
use serde::Serialize;

use super::{require_active, select_next_auto};
use crate::config::PlayoutSettings;
use crate::context::JobContext;
use crate::instances::sync_piece_instances;
use crate::lock::LockPriority;
use crate::timeline::autonext_time;

/// Pointers after a successful take.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TakeOutcome {
    pub previous_part_instance_id: Option<PartInstanceId>,
    pub current_part_instance_id: PartInstanceId,
    pub next_part_instance_id: Option<PartInstanceId>,
}

/// Take the next part.
///
/// `from_part_instance_id` is the current part the caller saw. A mismatch
/// means the caller acted on stale state and the take is refused.
pub async fn take_next_part(
    ctx: &JobContext,
    playlist_id: &PlaylistId,
    from_part_instance_id: Option<PartInstanceId>,
) -> CoreResult<TakeOutcome> {
    ctx.run_playlist_job(playlist_id, LockPriority::UserPlayout, "take_next_part", move |cache, ctx| {
        let now = ctx.now();
        let (activation, next_id) =
            check_take(cache, &ctx.settings, from_part_instance_id.as_ref(), now)?;
        let outcome = perform_take(cache, &activation, next_id, now);
        tracing::info!(
            playlist_id = %cache.playlist_id,
            current = %outcome.current_part_instance_id,
            next = ?outcome.next_part_instance_id,
            "Take"
        );
        Ok(outcome)
    })
    .await
}

fn check_take(
    cache: &PlayoutCache,
    settings: &PlayoutSettings,
    from: Option<&PartInstanceId>,
    now: Timestamp,
) -> CoreResult<(ActivationId, PartInstanceId)> {
    let activation = require_active(cache)?;
    let playlist = cache.playlist();

    if playlist.current_part_instance_id.as_ref() != from {
        return Err(CoreError::user(
            UserErrorCode::TakeFromIncorrectPart,
            "The current part has changed since this take was requested",
        ));
    }

    let next_id = playlist.next_part_instance_id.clone().ok_or_else(|| {
        CoreError::user(UserErrorCode::TakeNoNextPart, "There is no next part to take")
    })?;

    let span = settings.minimum_take_span;
    if let Some(at) = cache.current_part_instance().and_then(|c| autonext_time(c, now)) {
        if now >= at - span && now < at + span {
            return Err(CoreError::user(
                UserErrorCode::TakeCloseToAutonext,
                "Cannot take shortly before or after an autonext",
            ));
        }
    }

    if let Some(last) = playlist.last_take_time {
        if now - last < span {
            return Err(CoreError::user(
                UserErrorCode::TakeRateLimit,
                format!("Takes must be at least {}ms apart", span.num_milliseconds()),
            ));
        }
    }

    Ok((activation, next_id))
}

/// Move next to current and select a new next. No checks.
pub(crate) fn perform_take(
    cache: &mut PlayoutCache,
    activation: &ActivationId,
    next_id: PartInstanceId,
    at: Timestamp,
) -> TakeOutcome {
    let previous = cache.playlist().current_part_instance_id.clone();

    // Continuations are resolved against the part that is going off air.
    sync_piece_instances(cache, &next_id, previous.as_ref());
    cache.part_instances.update(&next_id, |pi| {
        pi.is_taken = true;
        pi.timings.take = Some(at);
    });
    if let Some(previous) = &previous {
        cache.part_instances.update(previous, |pi| pi.timings.take_out = Some(at));
    }

    cache.update_playlist(|pl| {
        pl.previous_part_instance_id = previous.clone();
        pl.current_part_instance_id = Some(next_id.clone());
        pl.next_part_instance_id = None;
        pl.next_part_manual = false;
        pl.last_take_time = Some(at);
        pl.modified_at = at;
    });

    let next = select_next_auto(cache, activation, at);
    TakeOutcome {
        previous_part_instance_id: previous,
        current_part_instance_id: next_id,
        next_part_instance_id: next,
    }
}
