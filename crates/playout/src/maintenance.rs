//! Periodic removal of old reset instances.
//!
//! Reset instances are history: they stay in the store, archived, until
//! they are older than the retention horizon and their part is gone.

use std::collections::HashSet;

use onair_core::error::{CoreError, CoreResult};
use onair_core::ids::{PartInstanceId, PlaylistId, RundownId};
use onair_core::instance::{PartInstance, PieceInstance};
use onair_core::playlist::RundownPlaylist;
use onair_core::rundown::{Part, Rundown};
use onair_core::types::Timestamp;
use onair_db::cache::fetch;
use onair_db::store::{ArchivedFilter, Collection, DocumentQuery, WriteOp};
use serde::Serialize;

use crate::context::JobContext;
use crate::lock::{LockKey, LockPriority};

/// What one cleanup pass deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub playlists: usize,
    pub part_instances: usize,
    pub piece_instances: usize,
}

fn persistence(e: impl std::fmt::Display) -> CoreError {
    CoreError::Persistence(e.to_string())
}

/// Delete reset instances older than `retention`.
///
/// Each playlist is cleaned under its own lock at maintenance priority, so
/// operator and ingest jobs go first. Instances of rundowns that no longer
/// exist are swept afterwards.
pub async fn cleanup_reset_instances(
    ctx: &JobContext,
    retention: chrono::Duration,
) -> CoreResult<CleanupReport> {
    let horizon = ctx.now() - retention;
    let playlists: Vec<RundownPlaylist> = fetch(
        ctx.store.as_ref(),
        DocumentQuery::all(Collection::Playlists).archived(ArchivedFilter::Exclude),
    )
    .await
    .map_err(persistence)?;

    let mut report = CleanupReport::default();
    for playlist in &playlists {
        let (parts, pieces) = clean_playlist(ctx, &playlist.id, horizon).await?;
        report.playlists += 1;
        report.part_instances += parts;
        report.piece_instances += pieces;
    }

    let rundowns: Vec<Rundown> = fetch(
        ctx.store.as_ref(),
        DocumentQuery::all(Collection::Rundowns).archived(ArchivedFilter::Exclude),
    )
    .await
    .map_err(persistence)?;
    let known: HashSet<RundownId> = rundowns.into_iter().map(|r| r.id).collect();
    let (parts, pieces) = delete_expired(ctx, None, horizon, |pi| !known.contains(&pi.rundown_id)).await?;
    report.part_instances += parts;
    report.piece_instances += pieces;

    if report.part_instances > 0 {
        tracing::info!(
            part_instances = report.part_instances,
            piece_instances = report.piece_instances,
            "Cleanup: purged reset instances"
        );
    } else {
        tracing::debug!(playlists = report.playlists, "Cleanup: nothing to purge");
    }
    Ok(report)
}

async fn clean_playlist(
    ctx: &JobContext,
    playlist_id: &PlaylistId,
    horizon: Timestamp,
) -> CoreResult<(usize, usize)> {
    let _guard = ctx
        .lock(LockKey::Playlist(playlist_id.clone()), LockPriority::Maintenance)
        .await?;

    let rundowns: Vec<Rundown> = fetch(
        ctx.store.as_ref(),
        DocumentQuery::live(Collection::Rundowns, vec![playlist_id.to_string()]),
    )
    .await
    .map_err(persistence)?;
    if rundowns.is_empty() {
        return Ok((0, 0));
    }
    let partitions: Vec<String> = rundowns.iter().map(|r| r.id.to_string()).collect();

    let parts: Vec<Part> = fetch(
        ctx.store.as_ref(),
        DocumentQuery::live(Collection::Parts, partitions.clone()),
    )
    .await
    .map_err(persistence)?;
    let existing: HashSet<_> = parts.into_iter().map(|p| p.id).collect();

    delete_expired(ctx, Some(partitions), horizon, |pi| !existing.contains(&pi.part.id)).await
}

/// Delete archived part instances reset before `horizon` that `eligible`
/// accepts, with their piece instances, in one commit.
async fn delete_expired(
    ctx: &JobContext,
    partitions: Option<Vec<String>>,
    horizon: Timestamp,
    eligible: impl Fn(&PartInstance) -> bool,
) -> CoreResult<(usize, usize)> {
    let query = |collection| DocumentQuery {
        collection,
        partitions: partitions.clone(),
        archived: ArchivedFilter::Only,
    };

    let instances: Vec<PartInstance> = fetch(ctx.store.as_ref(), query(Collection::PartInstances))
        .await
        .map_err(persistence)?;
    let expired: HashSet<PartInstanceId> = instances
        .into_iter()
        .filter(|pi| pi.reset_at().is_some_and(|at| at < horizon) && eligible(pi))
        .map(|pi| pi.id)
        .collect();
    if expired.is_empty() {
        return Ok((0, 0));
    }

    let pieces: Vec<PieceInstance> = fetch(ctx.store.as_ref(), query(Collection::PieceInstances))
        .await
        .map_err(persistence)?;
    let mut ops: Vec<WriteOp> = pieces
        .into_iter()
        .filter(|p| expired.contains(&p.part_instance_id))
        .map(|p| WriteOp::Delete {
            collection: Collection::PieceInstances,
            id: p.id.to_string(),
        })
        .collect();
    let piece_count = ops.len();
    ops.extend(expired.iter().map(|id| WriteOp::Delete {
        collection: Collection::PartInstances,
        id: id.to_string(),
    }));

    ctx.store.commit(ops).await.map_err(|e| {
        tracing::error!(error = %e, "Cleanup commit failed");
        persistence(e)
    })?;
    Ok((expired.len(), piece_count))
}
