use std::collections::HashSet;

use onair_core::error::{CoreError, CoreResult, UserErrorCode};
use onair_core::ids::{PartInstanceId, RundownId, SegmentId, StudioId};
use onair_core::ingest::IngestRundown;
use onair_core::rundown::Rundown;
use onair_db::cache::fetch_one;

use super::{
    apply_segment, cached_rundown, ensure_off_air, ensure_playlist, finish_ingest, load_rundown,
    remove_playlist_if_empty, remove_segment_content, segment_parts, validate, ChangedSegments,
};
use crate::blueprint::{select_show_style_variant, BlueprintContext};
use crate::context::JobContext;
use crate::instances::reset_part_instance;
use crate::lock::{LockKey, LockPriority};
use crate::playout::{deactivate_in_cache, select_next_auto};

/// Create or replace a rundown from a newsroom change-set.
///
/// A new rundown joins the playlist named by `playlist_external_id`, or a
/// playlist of its own. Segments absent from the change-set are removed.
pub async fn upsert_rundown(
    ctx: &JobContext,
    studio_id: &StudioId,
    ingest: IngestRundown,
) -> CoreResult<RundownId> {
    validate(&ingest)?;
    let rundown_id = ingest.rundown_id(studio_id);
    let _studio = ctx
        .lock(LockKey::Studio(studio_id.clone()), LockPriority::Ingest)
        .await?;

    let existing = fetch_one::<Rundown>(ctx.store.as_ref(), rundown_id.as_str())
        .await
        .map_err(|e| CoreError::Persistence(e.to_string()))?;
    let playlist_id = match existing {
        Some(rundown) => rundown.playlist_id,
        None => {
            let external_id = ingest
                .playlist_external_id
                .clone()
                .unwrap_or_else(|| ingest.external_id.clone());
            ensure_playlist(ctx, studio_id, external_id, ingest.name.clone()).await?
        }
    };

    let variant = select_show_style_variant(
        ctx.blueprint.as_ref(),
        &BlueprintContext {
            studio_id: studio_id.clone(),
            rundown_id: rundown_id.clone(),
        },
        &ctx.settings.show_style_variants,
        &ingest,
    );

    ctx.run_playlist_job(&playlist_id, LockPriority::Ingest, "upsert_rundown", |cache, ctx| {
        let now = ctx.now();
        let created_at = cache
            .rundowns
            .find_one(&rundown_id)
            .map_or(now, |r| r.created_at);
        let rundown = Rundown {
            id: rundown_id.clone(),
            external_id: ingest.external_id.clone(),
            studio_id: studio_id.clone(),
            playlist_id: cache.playlist_id.clone(),
            name: ingest.name.clone(),
            show_style_variant_id: variant,
            expected_start: ingest.expected_start,
            created_at,
            modified_at: now,
        };
        cache.rundowns.insert(rundown.clone());
        if !cache.rundown_ids().contains(&rundown_id) {
            cache.update_playlist(|pl| {
                pl.rundown_ids.push(rundown_id.clone());
                pl.modified_at = now;
            });
        }

        let incoming: HashSet<SegmentId> = ingest
            .segments
            .iter()
            .map(|s| s.segment_id(&rundown_id))
            .collect();
        let gone: Vec<SegmentId> = cache
            .segments
            .iter()
            .filter(|s| s.rundown_id == rundown_id && !incoming.contains(&s.id))
            .map(|s| s.id.clone())
            .collect();

        let mut changed = ChangedSegments::new();
        for segment_id in gone {
            changed.insert(segment_id.clone(), Some(segment_parts(cache, &segment_id)));
            remove_segment_content(cache, &segment_id);
        }
        for segment in &ingest.segments {
            let segment_id = segment.segment_id(&rundown_id);
            changed.insert(segment_id.clone(), Some(segment_parts(cache, &segment_id)));
            apply_segment(cache, &rundown, segment);
        }
        finish_ingest(cache, &changed, now);

        tracing::info!(
            rundown_id = %rundown_id,
            playlist_id = %cache.playlist_id,
            segments = ingest.segments.len(),
            "Rundown ingested"
        );
        Ok(rundown_id.clone())
    })
    .await
}

/// Remove a rundown and everything in it.
///
/// Refused while the rundown holds the current or next instance of an
/// active playlist. Its instances are reset, not deleted. A playlist left
/// without rundowns is deactivated and removed.
pub async fn remove_rundown(ctx: &JobContext, rundown_id: &RundownId) -> CoreResult<()> {
    let rundown = load_rundown(ctx, rundown_id).await?;
    let _studio = ctx
        .lock(LockKey::Studio(rundown.studio_id.clone()), LockPriority::Ingest)
        .await?;

    let emptied = ctx
        .run_playlist_job(&rundown.playlist_id, LockPriority::Ingest, "remove_rundown", |cache, ctx| {
            cached_rundown(cache, rundown_id)?;
            ensure_off_air(
                cache,
                rundown_id,
                UserErrorCode::RundownRemoveWhileOnAir,
                "remove",
            )?;
            let now = ctx.now();

            let instances: Vec<PartInstanceId> = cache
                .part_instances
                .iter()
                .filter(|pi| !pi.is_reset() && pi.rundown_id == *rundown_id)
                .map(|pi| pi.id.clone())
                .collect();
            for id in &instances {
                reset_part_instance(cache, id, now);
            }

            cache.adlib_pieces.remove(|a| a.rundown_id == *rundown_id);
            cache.pieces.remove(|p| p.rundown_id == *rundown_id);
            cache.parts.remove(|p| p.rundown_id == *rundown_id);
            cache.segments.remove(|s| s.rundown_id == *rundown_id);
            cache.rundowns.remove_by_id(rundown_id);
            cache.update_playlist(|pl| {
                pl.rundown_ids.retain(|id| id != rundown_id);
                pl.modified_at = now;
            });

            let emptied = cache.rundown_ids().is_empty();
            if emptied {
                deactivate_in_cache(cache, now);
            } else if let Some(activation) = cache.playlist().activation_id.clone() {
                if cache.playlist().next_part_instance_id.is_none() {
                    select_next_auto(cache, &activation, now);
                }
            }

            tracing::info!(
                rundown_id = %rundown_id,
                reset_instances = instances.len(),
                "Rundown removed"
            );
            Ok(emptied)
        })
        .await?;

    if emptied {
        remove_playlist_if_empty(ctx, &rundown.studio_id, &rundown.playlist_id).await?;
    }
    Ok(())
}
