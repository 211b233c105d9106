//! Latency feedback from device gateways.
//!
//! Nothing here affects playout. Reports are turned into `device.latency`
//! events and logged.

use onair_core::error::{CoreError, CoreResult};
use onair_core::ids::StudioId;
use onair_core::playback::TriggerTimeResult;
use onair_core::timeline::TimelineComplete;
use onair_db::cache::fetch_one;
use onair_events::{event_types, PlayoutEvent};
use serde::Serialize;

use crate::context::JobContext;

/// Gateway round trip for one timeline generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveLatency {
    pub studio_id: StudioId,
    pub timeline_hash: String,
    /// From generation until the gateway reported back.
    pub round_trip_ms: i64,
    /// Time the gateway spent resolving.
    pub resolve_duration_ms: i64,
}

/// Record that a gateway finished resolving a timeline.
///
/// Returns `None` when the hash is not the stored timeline's, which
/// happens when a newer generation superseded it.
pub async fn report_resolve_done(
    ctx: &JobContext,
    studio_id: &StudioId,
    timeline_hash: &str,
    resolve_duration_ms: i64,
) -> CoreResult<Option<ResolveLatency>> {
    let timeline = fetch_one::<TimelineComplete>(ctx.store.as_ref(), studio_id.as_str())
        .await
        .map_err(|e| CoreError::Persistence(e.to_string()))?;
    let Some(timeline) = timeline.filter(|t| t.timeline_hash == timeline_hash) else {
        tracing::debug!(studio_id = %studio_id, timeline_hash, "Resolve report for stale timeline");
        return Ok(None);
    };

    let now = ctx.now();
    let latency = ResolveLatency {
        studio_id: studio_id.clone(),
        timeline_hash: timeline.timeline_hash,
        round_trip_ms: (now - timeline.generated).num_milliseconds(),
        resolve_duration_ms,
    };
    tracing::info!(
        studio_id = %studio_id,
        round_trip_ms = latency.round_trip_ms,
        resolve_duration_ms,
        "Timeline resolved by gateway"
    );
    publish(ctx, studio_id, "resolve", &latency);
    Ok(Some(latency))
}

/// Record trigger times a gateway resolved for objects that started "now".
pub fn timeline_trigger_time(ctx: &JobContext, studio_id: &StudioId, results: &[TriggerTimeResult]) {
    if results.is_empty() {
        return;
    }
    tracing::debug!(studio_id = %studio_id, objects = results.len(), "Trigger times reported");
    publish(ctx, studio_id, "trigger_time", &results);
}

fn publish(ctx: &JobContext, studio_id: &StudioId, kind: &str, report: &impl Serialize) {
    match serde_json::to_value(report) {
        Ok(report) => ctx.bus.publish(
            PlayoutEvent::new(event_types::DEVICE_LATENCY)
                .with_studio(studio_id.clone())
                .with_payload(serde_json::json!({ "kind": kind, "report": report }))
                .at(ctx.now()),
        ),
        Err(e) => tracing::error!(error = %e, "Failed to encode latency report"),
    }
}
