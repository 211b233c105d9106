//! Playback reports from device gateways.

use onair_core::error::CoreResult;
use onair_core::ids::{PartInstanceId, PieceInstanceId, PlaylistId};
use onair_core::playback::{latest, PlayoutChange};
use onair_core::types::Timestamp;
use onair_db::cache::PlayoutCache;

use super::take::perform_take;
use crate::context::JobContext;
use crate::lock::LockPriority;

/// Record device-reported playback events.
///
/// Events are applied in order of their timestamps, and each field keeps
/// the latest reported time. A start reported for the next part is an
/// autonext performed by the device and completes the take. Unknown
/// instances are logged and skipped.
pub async fn on_playout_playback_changed(
    ctx: &JobContext,
    playlist_id: &PlaylistId,
    changes: Vec<PlayoutChange>,
) -> CoreResult<()> {
    ctx.run_playlist_job(
        playlist_id,
        LockPriority::Callback,
        "on_playout_playback_changed",
        move |cache, _ctx| {
            apply_playback_changes(cache, changes);
            Ok(())
        },
    )
    .await
}

pub(crate) fn apply_playback_changes(cache: &mut PlayoutCache, mut changes: Vec<PlayoutChange>) {
    changes.sort_by_key(PlayoutChange::time);
    for change in changes {
        match change {
            PlayoutChange::PartPlaybackStarted {
                part_instance_id,
                time,
            } => part_started(cache, &part_instance_id, time),
            PlayoutChange::PartPlaybackStopped {
                part_instance_id,
                time,
            } => {
                if !has_live_part_instance(cache, &part_instance_id) {
                    continue;
                }
                cache.part_instances.update(&part_instance_id, |pi| {
                    pi.timings.stopped_playback = Some(latest(pi.timings.stopped_playback, time));
                });
            }
            PlayoutChange::PiecePlaybackStarted {
                part_instance_id,
                piece_instance_id,
                time,
            } => update_piece(cache, &part_instance_id, &piece_instance_id, |p| {
                p.started_playback = Some(latest(p.started_playback, time));
            }),
            PlayoutChange::PiecePlaybackStopped {
                part_instance_id,
                piece_instance_id,
                time,
            } => update_piece(cache, &part_instance_id, &piece_instance_id, |p| {
                p.stopped_playback = Some(latest(p.stopped_playback, time));
            }),
        }
    }
}

fn has_live_part_instance(cache: &PlayoutCache, id: &PartInstanceId) -> bool {
    let found = cache
        .part_instances
        .find_one(id)
        .is_some_and(|pi| !pi.is_reset());
    if !found {
        tracing::warn!(
            playlist_id = %cache.playlist_id,
            part_instance_id = %id,
            "Playback report for unknown part instance"
        );
    }
    found
}

fn part_started(cache: &mut PlayoutCache, id: &PartInstanceId, time: Timestamp) {
    if !has_live_part_instance(cache, id) {
        return;
    }

    let playlist = cache.playlist();
    if playlist.next_part_instance_id.as_ref() == Some(id) {
        if let Some(activation) = playlist.activation_id.clone() {
            tracing::info!(
                playlist_id = %cache.playlist_id,
                part_instance_id = %id,
                "Device started the next part, completing take"
            );
            perform_take(cache, &activation, id.clone(), time);
        }
    }

    cache.part_instances.update(id, |pi| {
        pi.timings.started_playback = Some(latest(pi.timings.started_playback, time));
    });
    if cache.playlist().started_playback.is_none() {
        cache.update_playlist(|pl| pl.started_playback = Some(time));
    }
}

fn update_piece(
    cache: &mut PlayoutCache,
    part_instance_id: &PartInstanceId,
    piece_instance_id: &PieceInstanceId,
    modifier: impl FnOnce(&mut onair_core::instance::PieceInstance),
) {
    let known = cache
        .piece_instances
        .find_one(piece_instance_id)
        .is_some_and(|p| !p.reset && p.part_instance_id == *part_instance_id);
    if !known {
        tracing::warn!(
            playlist_id = %cache.playlist_id,
            part_instance_id = %part_instance_id,
            piece_instance_id = %piece_instance_id,
            "Playback report for unknown piece instance"
        );
        return;
    }
    cache.piece_instances.update(piece_instance_id, modifier);
}
