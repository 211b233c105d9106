//! Ad-lib pieces started by the operator.

use onair_core::error::{CoreError, CoreResult, UserErrorCode};
use onair_core::ids::{AdLibPieceId, PartId, PartInstanceId, PieceInstanceId, PlaylistId};
use onair_core::instance::{InfiniteContinuation, InstanceLifecycle, OrphanReason, PartInstance, PieceInstance};
use onair_core::rundown::{AdLibPiece, Part};
use onair_core::types::{Rank, Timestamp};
use onair_db::cache::PlayoutCache;
use serde::Serialize;

use super::{point_next, require_active};
use crate::context::JobContext;
use crate::lock::LockPriority;
use crate::timeline::instance_start;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdlibOutcome {
    /// The instance the piece was placed in.
    pub part_instance_id: PartInstanceId,
    pub piece_instance_id: PieceInstanceId,
    /// Whether a new part was queued as next.
    pub queued: bool,
}

/// Start an ad-lib piece.
///
/// Without `queue` the piece joins the current part from now on. With
/// `queue` it gets its own part, ranked right after the current one and
/// set as next.
pub async fn ad_lib_piece_start(
    ctx: &JobContext,
    playlist_id: &PlaylistId,
    part_instance_id: PartInstanceId,
    adlib_piece_id: AdLibPieceId,
    queue: bool,
) -> CoreResult<AdlibOutcome> {
    ctx.run_playlist_job(playlist_id, LockPriority::UserPlayout, "ad_lib_piece_start", move |cache, ctx| {
        require_active(cache)?;
        let now = ctx.now();

        let target = cache
            .part_instances
            .find_one(&part_instance_id)
            .filter(|pi| !pi.is_reset())
            .cloned()
            .ok_or_else(|| {
                CoreError::not_found(
                    UserErrorCode::PartInstanceNotFound,
                    "PartInstance",
                    &part_instance_id,
                )
            })?;
        if cache.playlist().current_part_instance_id.as_ref() != Some(&target.id) {
            return Err(CoreError::user(
                UserErrorCode::AdlibRequiresCurrentPart,
                "Ad-libs can only be started in the part that is on air",
            ));
        }
        let adlib = cache
            .adlib_pieces
            .find_one(&adlib_piece_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(UserErrorCode::AdlibNotFound, "AdLibPiece", &adlib_piece_id))?;

        let outcome = if queue {
            queue_adlib_part(cache, &target, &adlib, now)
        } else {
            insert_adlib_piece(cache, &target, &adlib, now)
        };
        tracing::info!(
            playlist_id = %cache.playlist_id,
            adlib_piece_id = %adlib.id,
            part_instance_id = %outcome.part_instance_id,
            queued = outcome.queued,
            "Ad-lib started"
        );
        Ok(outcome)
    })
    .await
}

fn adlib_instance(
    part_instance: &PartInstance,
    adlib: &AdLibPiece,
    start: i64,
    now: Timestamp,
) -> PieceInstance {
    let piece = adlib.to_piece(&part_instance.part.id, start);
    let mut instance = PieceInstance::for_piece(part_instance, &piece);
    instance.adlib_source_id = Some(adlib.id.clone());
    instance.adlibbed_at = Some(now);
    if piece.lifespan.is_infinite() {
        instance.infinite = Some(InfiniteContinuation {
            infinite_instance_id: instance.id.to_string(),
            infinite_piece_id: piece.id.clone(),
            from_previous_part: false,
        });
    }
    instance
}

fn insert_adlib_piece(
    cache: &mut PlayoutCache,
    current: &PartInstance,
    adlib: &AdLibPiece,
    now: Timestamp,
) -> AdlibOutcome {
    let offset = instance_start(current)
        .map(|start| (now - start).num_milliseconds().max(0))
        .unwrap_or(0);
    let instance = adlib_instance(current, adlib, offset, now);
    let piece_instance_id = cache.piece_instances.insert(instance);
    AdlibOutcome {
        part_instance_id: current.id.clone(),
        piece_instance_id,
        queued: false,
    }
}

/// Rank between the current part and the next part of its segment.
fn rank_after(cache: &PlayoutCache, current: &PartInstance) -> Rank {
    let following = cache
        .parts
        .iter()
        .filter(|p| p.segment_id == current.segment_id && p.rank > current.rank())
        .map(|p| p.rank)
        .fold(None, |min: Option<Rank>, rank| Some(min.map_or(rank, |m| m.min(rank))));
    match following {
        Some(next) => (current.rank() + next) / 2.0,
        None => current.rank() + 1.0,
    }
}

fn queue_adlib_part(
    cache: &mut PlayoutCache,
    current: &PartInstance,
    adlib: &AdLibPiece,
    now: Timestamp,
) -> AdlibOutcome {
    let millis = now.timestamp_millis().to_string();
    let part = Part {
        id: PartId::derived(&[current.id.as_str(), adlib.id.as_str(), &millis]),
        rundown_id: current.rundown_id.clone(),
        segment_id: current.segment_id.clone(),
        external_id: adlib.external_id.clone(),
        title: adlib.name.clone(),
        rank: rank_after(cache, current),
        expected_duration: adlib.expected_duration,
        auto_next: false,
        auto_next_overlap: 0,
        invalid: false,
        floated: false,
    };

    let mut part_instance = PartInstance::new(current.activation_id.clone(), &part);
    part_instance.lifecycle = InstanceLifecycle::Orphaned {
        reason: OrphanReason::AdlibPart,
    };
    let piece = adlib_instance(&part_instance, adlib, 0, now);
    let part_instance_id = cache.part_instances.insert(part_instance);
    let piece_instance_id = cache.piece_instances.insert(piece);

    point_next(cache, Some(part_instance_id.clone()), true, now);
    AdlibOutcome {
        part_instance_id,
        piece_instance_id,
        queued: true,
    }
}
