//! Moving rundowns between playlists and ordering them within one.

use onair_core::error::{CoreError, CoreResult, UserErrorCode};
use onair_core::ids::{PlaylistId, RundownId};
use onair_db::cache::PlayoutCache;

use super::{
    cached_rundown, ensure_off_air, ensure_playlist, finish_ingest, load_rundown,
    remove_playlist_if_empty, ChangedSegments,
};
use crate::context::JobContext;
use crate::lock::{LockKey, LockPriority};
use crate::playout::{deactivate_in_cache, studio_of};

/// Reorder `rundown_ids` by their position in `order`. Rundowns missing
/// from `order` keep their relative order at the end.
fn apply_order(rundown_ids: &mut [RundownId], order: &[RundownId]) {
    rundown_ids.sort_by_key(|id| order.iter().position(|o| o == id).unwrap_or(usize::MAX));
}

/// Move a rundown into another playlist, or into a new one of its own when
/// `target` is `None`. `order` is the requested rundown order of the
/// target playlist.
///
/// Refused while the rundown is on air in its current playlist. A source
/// playlist left empty is removed.
pub async fn move_rundown(
    ctx: &JobContext,
    rundown_id: &RundownId,
    target: Option<PlaylistId>,
    order: Vec<RundownId>,
) -> CoreResult<PlaylistId> {
    let rundown = load_rundown(ctx, rundown_id).await?;
    let studio_id = rundown.studio_id.clone();
    let _studio = ctx
        .lock(LockKey::Studio(studio_id.clone()), LockPriority::Ingest)
        .await?;
    let source = rundown.playlist_id.clone();

    let target = match target {
        Some(id) => {
            if studio_of(ctx, &id).await? != studio_id {
                return Err(CoreError::user(
                    UserErrorCode::PlaylistNotFound,
                    format!("Playlist \"{id}\" is not in studio \"{studio_id}\""),
                ));
            }
            id
        }
        None => {
            let external_id = format!("{}:{}", rundown.external_id, ctx.now().timestamp_millis());
            ensure_playlist(ctx, &studio_id, external_id, rundown.name.clone()).await?
        }
    };

    if target == source {
        reorder(ctx, &target, order).await?;
        return Ok(target);
    }

    let emptied = ctx
        .run_playlist_job(&source, LockPriority::Ingest, "move_rundown_out", |cache, ctx| {
            cached_rundown(cache, rundown_id)?;
            ensure_off_air(cache, rundown_id, UserErrorCode::RundownMoveWhileOnAir, "move")?;
            let now = ctx.now();
            cache.rundowns.update(rundown_id, |r| {
                r.playlist_id = target.clone();
                r.modified_at = now;
            });
            cache.update_playlist(|pl| {
                pl.rundown_ids.retain(|id| id != rundown_id);
                pl.modified_at = now;
            });

            // Current and next are elsewhere, so the next pointer stays valid.
            let emptied = cache.rundown_ids().is_empty();
            if emptied {
                deactivate_in_cache(cache, now);
            }
            Ok(emptied)
        })
        .await?;

    ctx.run_playlist_job(&target, LockPriority::Ingest, "move_rundown_in", |cache, ctx| {
        let now = ctx.now();
        cache.update_playlist(|pl| {
            if !pl.rundown_ids.contains(rundown_id) {
                pl.rundown_ids.push(rundown_id.clone());
            }
            apply_order(&mut pl.rundown_ids, &order);
            pl.modified_at = now;
        });
        finish_ingest(cache, &ChangedSegments::new(), now);
        Ok(())
    })
    .await?;

    tracing::info!(
        rundown_id = %rundown_id,
        from = %source,
        to = %target,
        "Rundown moved"
    );

    if emptied {
        remove_playlist_if_empty(ctx, &studio_id, &source).await?;
    }
    Ok(target)
}

async fn reorder(ctx: &JobContext, playlist_id: &PlaylistId, order: Vec<RundownId>) -> CoreResult<()> {
    ctx.run_playlist_job(playlist_id, LockPriority::Ingest, "reorder_rundowns", |cache, ctx| {
        let now = ctx.now();
        cache.update_playlist(|pl| {
            apply_order(&mut pl.rundown_ids, &order);
            pl.modified_at = now;
        });
        finish_ingest(cache, &ChangedSegments::new(), now);
        Ok(())
    })
    .await
}

fn default_order(cache: &PlayoutCache) -> Vec<RundownId> {
    let mut rundowns: Vec<_> = cache.rundowns.iter().collect();
    rundowns.sort_by(|a, b| {
        match (a.expected_start, b.expected_start) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then_with(|| a.name.cmp(&b.name))
    });
    rundowns.into_iter().map(|r| r.id.clone()).collect()
}

/// Put a playlist's rundowns back in their natural order: by expected
/// start, then by name.
pub async fn restore_rundown_order(ctx: &JobContext, playlist_id: &PlaylistId) -> CoreResult<Vec<RundownId>> {
    ctx.run_playlist_job(playlist_id, LockPriority::Ingest, "restore_rundown_order", |cache, ctx| {
        let order = default_order(cache);
        let now = ctx.now();
        cache.update_playlist(|pl| {
            apply_order(&mut pl.rundown_ids, &order);
            pl.modified_at = now;
        });
        finish_ingest(cache, &ChangedSegments::new(), now);
        Ok(cache.rundown_ids().to_vec())
    })
    .await
}
