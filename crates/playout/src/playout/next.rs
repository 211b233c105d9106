//! Selecting the next part.

use onair_core::error::{CoreError, CoreResult, UserErrorCode};
use onair_core::ids::{ActivationId, PartId, PartInstanceId, PlaylistId, SegmentId};
use onair_core::instance::PartInstance;
use onair_core::rundown::Part;
use onair_core::types::Timestamp;
use onair_db::cache::PlayoutCache;
use serde::Deserialize;

use super::require_active;
use crate::context::JobContext;
use crate::instances::{ensure_part_instance, reset_part_instance, sync_piece_instances};
use crate::lock::LockPriority;

/// What the operator pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextTarget {
    Part(PartId),
    PartInstance(PartInstanceId),
}

fn is_selectable(cache: &PlayoutCache, part: &Part) -> bool {
    part.is_playable()
        && !cache
            .segments
            .find_one(&part.segment_id)
            .is_some_and(|s| s.hidden)
}

/// The first selectable part after `after` in running order, or the first
/// of the playlist when `after` is `None`.
pub(crate) fn find_next_part(cache: &PlayoutCache, after: Option<&PartInstance>) -> Option<Part> {
    let order = cache.running_order();
    let parts = order.sort_parts(cache.parts.iter());
    match after {
        None => parts.into_iter().find(|p| is_selectable(cache, p)).cloned(),
        Some(instance) => {
            let key = order.key(&instance.rundown_id, &instance.segment_id, instance.rank());
            parts
                .into_iter()
                .filter(|p| p.id != instance.part.id && order.part_key(p) > key)
                .find(|p| is_selectable(cache, p))
                .cloned()
        }
    }
}

/// Drop the current next pointer's instance if it never played.
fn release_next(cache: &mut PlayoutCache, keep: Option<&PartInstanceId>, now: Timestamp) {
    let Some(old) = cache.playlist().next_part_instance_id.clone() else {
        return;
    };
    if Some(&old) == keep {
        return;
    }
    let untaken = cache
        .part_instances
        .find_one(&old)
        .is_some_and(|pi| !pi.is_taken);
    if untaken {
        reset_part_instance(cache, &old, now);
    }
}

/// Point next at `part` (or nothing), deriving its instance and pieces.
pub(crate) fn set_next_in_cache(
    cache: &mut PlayoutCache,
    activation_id: &ActivationId,
    part: Option<&Part>,
    manual: bool,
    now: Timestamp,
) -> Option<PartInstanceId> {
    let next_id = part.map(|p| ensure_part_instance(cache, activation_id, p));
    point_next(cache, next_id.clone(), manual, now);
    next_id
}

/// Point next at an existing untaken instance.
pub(crate) fn point_next(
    cache: &mut PlayoutCache,
    next_id: Option<PartInstanceId>,
    manual: bool,
    now: Timestamp,
) {
    release_next(cache, next_id.as_ref(), now);
    if let Some(id) = &next_id {
        let current = cache.playlist().current_part_instance_id.clone();
        sync_piece_instances(cache, id, current.as_ref());
    }
    cache.update_playlist(|pl| {
        pl.next_part_manual = manual && next_id.is_some();
        pl.next_part_instance_id = next_id;
        pl.modified_at = now;
    });
}

/// Select the part following current automatically.
pub(crate) fn select_next_auto(
    cache: &mut PlayoutCache,
    activation_id: &ActivationId,
    now: Timestamp,
) -> Option<PartInstanceId> {
    let current = cache.current_part_instance().cloned();
    let part = find_next_part(cache, current.as_ref());
    set_next_in_cache(cache, activation_id, part.as_ref(), false, now)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Set the next part explicitly. Returns the next instance.
pub async fn set_next_part(
    ctx: &JobContext,
    playlist_id: &PlaylistId,
    target: NextTarget,
) -> CoreResult<PartInstanceId> {
    ctx.run_playlist_job(playlist_id, LockPriority::UserPlayout, "set_next_part", move |cache, ctx| {
        let activation = require_active(cache)?;
        let now = ctx.now();
        let current = cache.current_part_instance().cloned();

        let next_id = match target {
            NextTarget::Part(part_id) => {
                let part = cache
                    .parts
                    .find_one(&part_id)
                    .cloned()
                    .ok_or_else(|| CoreError::not_found(UserErrorCode::PartNotFound, "Part", &part_id))?;
                if current.as_ref().is_some_and(|c| c.part.id == part.id) {
                    return Err(set_next_to_current());
                }
                set_next_in_cache(cache, &activation, Some(&part), true, now)
            }
            NextTarget::PartInstance(instance_id) => {
                let instance = cache
                    .part_instances
                    .find_one(&instance_id)
                    .filter(|pi| !pi.is_reset())
                    .cloned()
                    .ok_or_else(|| {
                        CoreError::not_found(
                            UserErrorCode::PartInstanceNotFound,
                            "PartInstance",
                            &instance_id,
                        )
                    })?;
                if current.as_ref().is_some_and(|c| c.id == instance.id) {
                    return Err(set_next_to_current());
                }
                if instance.is_taken || instance.activation_id != activation {
                    // Played before: queue a fresh instance of the same part.
                    let part = cache.parts.find_one(&instance.part.id).cloned().ok_or_else(|| {
                        CoreError::not_found(UserErrorCode::PartNotFound, "Part", &instance.part.id)
                    })?;
                    set_next_in_cache(cache, &activation, Some(&part), true, now)
                } else {
                    point_next(cache, Some(instance.id.clone()), true, now);
                    Some(instance.id)
                }
            }
        };

        tracing::info!(
            playlist_id = %cache.playlist_id,
            next_part_instance_id = ?next_id,
            "Next part set"
        );
        next_id.ok_or_else(|| CoreError::Internal("next part was not selected".into()))
    })
    .await
}

fn set_next_to_current() -> CoreError {
    CoreError::user(
        UserErrorCode::SetNextToCurrentPart,
        "The current part cannot also be next",
    )
}

/// Move the next pointer relative to where it is.
///
/// `part_delta` steps through selectable parts, then `segment_delta` jumps
/// to the first part of a segment that many segments away. Both clamp at
/// the ends of the playlist. The current part is stepped over; when it sits
/// at the clamped end, the next pointer is left where it was.
pub async fn move_next_part(
    ctx: &JobContext,
    playlist_id: &PlaylistId,
    part_delta: i32,
    segment_delta: i32,
) -> CoreResult<Option<PartId>> {
    ctx.run_playlist_job(playlist_id, LockPriority::UserPlayout, "move_next_part", move |cache, ctx| {
        let activation = require_active(cache)?;
        if part_delta == 0 && segment_delta == 0 {
            return Ok(cache.next_part_instance().map(|pi| pi.part.id.clone()));
        }

        let order = cache.running_order();
        let playable: Vec<Part> = order
            .sort_parts(cache.parts.iter())
            .into_iter()
            .filter(|p| is_selectable(cache, p))
            .cloned()
            .collect();
        if playable.is_empty() {
            return Ok(None);
        }
        let last = playable.len() as i64 - 1;

        let reference = cache
            .next_part_instance()
            .or_else(|| cache.current_part_instance())
            .cloned();
        let mut index = match &reference {
            Some(instance) => {
                let key = order.key(&instance.rundown_id, &instance.segment_id, instance.rank());
                playable
                    .iter()
                    .position(|p| order.part_key(p) >= key)
                    .unwrap_or(playable.len() - 1) as i64
            }
            None => 0,
        };

        if part_delta != 0 {
            index = (index + i64::from(part_delta)).clamp(0, last);
        }

        if segment_delta != 0 {
            let mut segments: Vec<&SegmentId> = Vec::new();
            for part in &playable {
                if segments.last() != Some(&&part.segment_id) {
                    segments.push(&part.segment_id);
                }
            }
            let here = &playable[index as usize].segment_id;
            let position = segments.iter().position(|s| *s == here).unwrap_or(0) as i64;
            let target = (position + i64::from(segment_delta)).clamp(0, segments.len() as i64 - 1);
            let target_segment = segments[target as usize];
            index = playable
                .iter()
                .position(|p| p.segment_id == *target_segment)
                .unwrap_or(0) as i64;
        }

        let current_part = cache.current_part_instance().map(|c| c.part.id.clone());
        if current_part.as_ref() == Some(&playable[index as usize].id) {
            let step = if part_delta < 0 || (part_delta == 0 && segment_delta < 0) { -1 } else { 1 };
            let stepped = index + step;
            if !(0..=last).contains(&stepped) {
                // Nothing lies beyond the current part in that direction.
                return Ok(cache.next_part_instance().map(|pi| pi.part.id.clone()));
            }
            index = stepped;
        }

        let part = playable[index as usize].clone();
        set_next_in_cache(cache, &activation, Some(&part), true, ctx.now());
        tracing::info!(playlist_id = %cache.playlist_id, part_id = %part.id, "Next part moved");
        Ok(Some(part.id))
    })
    .await
}
