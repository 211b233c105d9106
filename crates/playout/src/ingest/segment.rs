use onair_core::error::{CoreError, CoreResult, UserErrorCode};
use onair_core::ids::{RundownId, SegmentId};
use onair_core::ingest::IngestSegment;

use super::{
    apply_segment, cached_rundown, finish_ingest, load_rundown, remove_segment_content,
    segment_parts, validate, ChangedSegments,
};
use crate::context::JobContext;
use crate::lock::LockPriority;

/// Create or replace one segment of an existing rundown.
pub async fn upsert_segment(
    ctx: &JobContext,
    rundown_id: &RundownId,
    ingest: IngestSegment,
) -> CoreResult<SegmentId> {
    validate(&ingest)?;
    let rundown = load_rundown(ctx, rundown_id).await?;

    ctx.run_playlist_job(&rundown.playlist_id, LockPriority::Ingest, "upsert_segment", |cache, ctx| {
        let rundown = cached_rundown(cache, rundown_id)?;
        let segment_id = ingest.segment_id(rundown_id);
        let before = segment_parts(cache, &segment_id);
        apply_segment(cache, &rundown, &ingest);
        finish_ingest(
            cache,
            &ChangedSegments::from([(segment_id.clone(), Some(before))]),
            ctx.now(),
        );
        tracing::info!(
            rundown_id = %rundown_id,
            segment_id = %segment_id,
            parts = ingest.parts.len(),
            "Segment ingested"
        );
        Ok(segment_id)
    })
    .await
}

/// Remove one segment. Instances of its parts that are still on air are
/// orphaned rather than dropped.
pub async fn remove_segment(
    ctx: &JobContext,
    rundown_id: &RundownId,
    segment_external_id: &str,
) -> CoreResult<()> {
    let rundown = load_rundown(ctx, rundown_id).await?;
    let segment_id = SegmentId::derived(&[rundown_id.as_str(), segment_external_id]);

    ctx.run_playlist_job(&rundown.playlist_id, LockPriority::Ingest, "remove_segment", |cache, ctx| {
        cached_rundown(cache, rundown_id)?;
        if cache.segments.find_one(&segment_id).is_none() {
            return Err(CoreError::not_found(
                UserErrorCode::SegmentNotFound,
                "Segment",
                &segment_id,
            ));
        }
        let before = segment_parts(cache, &segment_id);
        remove_segment_content(cache, &segment_id);
        finish_ingest(
            cache,
            &ChangedSegments::from([(segment_id.clone(), Some(before))]),
            ctx.now(),
        );
        tracing::info!(rundown_id = %rundown_id, segment_id = %segment_id, "Segment removed");
        Ok(())
    })
    .await
}
