//! Applying newsroom changes to a playlist.
//!
//! Ingest replaces design-time documents wholesale, keyed by external id.
//! Instances are never edited to match except for their rank; instances
//! whose part vanished become orphans and keep their place in the running
//! order between the neighbours they had.

mod order;
mod ranks;
mod rundown;
mod segment;

pub use order::{move_rundown, restore_rundown_order};
pub use ranks::ChangedSegments;
pub use rundown::{remove_rundown, upsert_rundown};
pub use segment::{remove_segment, upsert_segment};

use std::collections::HashSet;

use onair_core::error::{CoreError, CoreResult, UserErrorCode};
use onair_core::ids::{PartId, PlaylistId, RundownId, SegmentId, StudioId};
use onair_core::ingest::IngestSegment;
use onair_core::instance::OrphanReason;
use onair_core::playlist::RundownPlaylist;
use onair_core::ranks::RankedPart;
use onair_core::rundown::Rundown;
use onair_core::types::Timestamp;
use onair_db::cache::{fetch_one, PlayoutCache};
use validator::Validate;

use crate::context::JobContext;
use crate::instances::sync_piece_instances;
use crate::lock::LockPriority;
use crate::playout::select_next_auto;

fn validate(input: &impl Validate) -> CoreResult<()> {
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))
}

/// Read a rundown outside any lock, to find which playlist to lock.
async fn load_rundown(ctx: &JobContext, rundown_id: &RundownId) -> CoreResult<Rundown> {
    fetch_one::<Rundown>(ctx.store.as_ref(), rundown_id.as_str())
        .await
        .map_err(|e| CoreError::Persistence(e.to_string()))?
        .ok_or_else(|| CoreError::not_found(UserErrorCode::RundownNotFound, "Rundown", rundown_id))
}

/// The rundown as the locked cache sees it. It may have moved since it was
/// looked up.
fn cached_rundown(cache: &PlayoutCache, rundown_id: &RundownId) -> CoreResult<Rundown> {
    cache
        .rundowns
        .find_one(rundown_id)
        .cloned()
        .ok_or_else(|| CoreError::not_found(UserErrorCode::RundownNotFound, "Rundown", rundown_id))
}

/// `(part, rank)` pairs of a segment as they are now.
fn segment_parts(cache: &PlayoutCache, segment_id: &SegmentId) -> Vec<RankedPart> {
    let mut parts: Vec<RankedPart> = cache
        .parts
        .iter()
        .filter(|p| p.segment_id == *segment_id)
        .map(|p| RankedPart::new(p.id.clone(), p.rank))
        .collect();
    parts.sort_by(|a, b| a.rank.total_cmp(&b.rank));
    parts
}

fn remove_parts(cache: &mut PlayoutCache, ids: &HashSet<PartId>) {
    if ids.is_empty() {
        return;
    }
    cache.parts.remove(|p| ids.contains(&p.id));
    cache.pieces.remove(|p| ids.contains(&p.part_id));
    cache
        .adlib_pieces
        .remove(|a| a.part_id.as_ref().is_some_and(|id| ids.contains(id)));
}

/// Replace one segment's content with what ingest sent.
fn apply_segment(cache: &mut PlayoutCache, rundown: &Rundown, ingest: &IngestSegment) -> SegmentId {
    let segment = ingest.to_segment(&rundown.id);
    let segment_id = segment.id.clone();
    cache.segments.insert(segment);

    let incoming: HashSet<PartId> = ingest.parts.iter().map(|p| p.part_id(&rundown.id)).collect();
    let dropped: HashSet<PartId> = cache
        .parts
        .iter()
        .filter(|p| p.segment_id == segment_id && !incoming.contains(&p.id))
        .map(|p| p.id.clone())
        .collect();
    remove_parts(cache, &dropped);

    for ingest_part in &ingest.parts {
        let part = ingest_part.to_part(&rundown.id, &segment_id);
        let part_id = cache.parts.insert(part);
        cache.pieces.remove(|p| p.part_id == part_id);
        for piece in &ingest_part.pieces {
            cache.pieces.insert(piece.to_piece(&rundown.id, &part_id));
        }
        cache
            .adlib_pieces
            .remove(|a| a.part_id.as_ref() == Some(&part_id));
        for adlib in &ingest_part.adlibs {
            cache.adlib_pieces.insert(adlib.to_adlib(&rundown.id, &part_id));
        }
    }
    segment_id
}

/// Remove a segment's parts. The segment document stays while an on-air
/// instance still refers to it, so the running order can still place it.
fn remove_segment_content(cache: &mut PlayoutCache, segment_id: &SegmentId) {
    let parts: HashSet<PartId> = cache
        .parts
        .iter()
        .filter(|p| p.segment_id == *segment_id)
        .map(|p| p.id.clone())
        .collect();
    remove_parts(cache, &parts);

    let in_use = [cache.current_part_instance(), cache.next_part_instance()]
        .into_iter()
        .flatten()
        .any(|pi| pi.segment_id == *segment_id);
    if in_use {
        cache.segments.update(segment_id, |s| s.hidden = true);
    } else {
        cache.segments.remove_by_id(segment_id);
    }
}

/// Reconcile instances with the edited content and repair the next pointer.
fn finish_ingest(cache: &mut PlayoutCache, changed: &ChangedSegments, now: Timestamp) {
    ranks::update_part_instance_ranks(cache, changed);
    revalidate_next(cache, now);
}

/// Keep a manual next unless its part went away; otherwise re-select.
fn revalidate_next(cache: &mut PlayoutCache, now: Timestamp) {
    let Some(activation) = cache.playlist().activation_id.clone() else {
        return;
    };
    let next = cache.next_part_instance().cloned();
    let keep = match &next {
        Some(pi) => {
            cache.playlist().next_part_manual
                && pi.orphan_reason() != Some(OrphanReason::Deleted)
        }
        None => false,
    };

    match next {
        Some(pi) if keep => {
            let current = cache.playlist().current_part_instance_id.clone();
            sync_piece_instances(cache, &pi.id, current.as_ref());
        }
        _ => {
            select_next_auto(cache, &activation, now);
        }
    }
}

/// Find or create the playlist a new rundown joins. Caller holds the
/// studio lock.
async fn ensure_playlist(
    ctx: &JobContext,
    studio_id: &StudioId,
    external_id: String,
    name: String,
) -> CoreResult<PlaylistId> {
    let playlist_id = PlaylistId::derived(&[studio_id.as_str(), &external_id]);
    ctx.run_studio_job(studio_id, LockPriority::Ingest, "ensure_playlist", |cache, ctx| {
        if cache.playlists.find_one(&playlist_id).is_none() {
            cache.playlists.insert(RundownPlaylist::new(
                playlist_id.clone(),
                external_id,
                studio_id.clone(),
                name,
                ctx.now(),
            ));
            tracing::info!(studio_id = %studio_id, playlist_id = %playlist_id, "Created playlist");
        }
        Ok(playlist_id.clone())
    })
    .await
}

/// Delete a playlist that no longer has rundowns. Caller holds the studio
/// lock.
async fn remove_playlist_if_empty(
    ctx: &JobContext,
    studio_id: &StudioId,
    playlist_id: &PlaylistId,
) -> CoreResult<bool> {
    ctx.run_studio_job(studio_id, LockPriority::Ingest, "remove_empty_playlist", |cache, _| {
        let empty = cache
            .playlists
            .find_one(playlist_id)
            .is_some_and(|pl| pl.rundown_ids.is_empty() && !pl.is_active());
        if empty {
            cache.playlists.remove_by_id(playlist_id);
            tracing::info!(playlist_id = %playlist_id, "Removed empty playlist");
        }
        Ok(empty)
    })
    .await
}

/// Refuse to change a rundown that holds the current or next instance of
/// an active playlist.
fn ensure_off_air(
    cache: &PlayoutCache,
    rundown_id: &RundownId,
    code: UserErrorCode,
    action: &str,
) -> CoreResult<()> {
    if !cache.playlist().is_active() {
        return Ok(());
    }
    let on_air = [cache.current_part_instance(), cache.next_part_instance()]
        .into_iter()
        .flatten()
        .any(|pi| pi.rundown_id == *rundown_id);
    if on_air {
        return Err(CoreError::user(
            code,
            format!("Cannot {action} a rundown that is on air"),
        ));
    }
    Ok(())
}
