//! Entry point used by the API and the worker.
//!
//! Each call runs as its own job: a fresh job id, so locks held by one
//! caller are never re-entered by another.

use std::sync::Arc;

use onair_core::clock::Clock;
use onair_core::error::{CoreError, CoreResult};
use onair_core::ids::{
    ActivationId, AdLibPieceId, PartId, PartInstanceId, PlaylistId, RundownId, SegmentId, StudioId,
};
use onair_core::ingest::{IngestRundown, IngestSegment};
use onair_core::instance::{PartInstance, PieceInstance};
use onair_core::playback::{PlayoutChange, TriggerTimeResult};
use onair_core::playlist::RundownPlaylist;
use onair_core::timeline::TimelineComplete;
use onair_db::cache::fetch_one;
use onair_db::store::DocumentStore;
use onair_events::EventBus;
use serde::Serialize;

use crate::blueprint::Blueprint;
use crate::config::PlayoutSettings;
use crate::context::JobContext;
use crate::ingest;
use crate::lock::{JobId, LockManager};
use crate::maintenance::{self, CleanupReport};
use crate::playout::{self, AdlibOutcome, NextTarget, ResetOptions, TakeOutcome};
use crate::telemetry::{self, ResolveLatency};

/// A part instance with its live pieces.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceView {
    #[serde(flatten)]
    pub instance: PartInstance,
    pub pieces: Vec<PieceInstance>,
}

/// Read model of a playlist and its selected instances.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistView {
    pub playlist: RundownPlaylist,
    pub current: Option<InstanceView>,
    pub next: Option<InstanceView>,
    pub previous: Option<InstanceView>,
}

#[derive(Clone)]
pub struct PlayoutEngine {
    template: JobContext,
}

impl std::fmt::Debug for PlayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayoutEngine")
            .field("settings", &self.template.settings)
            .finish_non_exhaustive()
    }
}

impl PlayoutEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        bus: Arc<EventBus>,
        settings: PlayoutSettings,
        blueprint: Arc<dyn Blueprint>,
    ) -> Self {
        Self {
            template: JobContext {
                store,
                locks: Arc::new(LockManager::new()),
                clock,
                bus,
                settings: Arc::new(settings),
                blueprint,
                job_id: JobId::new(),
            },
        }
    }

    fn job(&self) -> JobContext {
        self.template.next_job()
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.template.bus
    }

    pub fn settings(&self) -> &PlayoutSettings {
        &self.template.settings
    }

    // -----------------------------------------------------------------------
    // Operator actions
    // -----------------------------------------------------------------------

    pub async fn activate(&self, playlist_id: &PlaylistId, rehearsal: bool, force: bool) -> CoreResult<ActivationId> {
        playout::activate(&self.job(), playlist_id, rehearsal, force).await
    }

    pub async fn prepare_for_broadcast(&self, playlist_id: &PlaylistId) -> CoreResult<ActivationId> {
        playout::prepare_for_broadcast(&self.job(), playlist_id).await
    }

    pub async fn deactivate(&self, playlist_id: &PlaylistId) -> CoreResult<()> {
        playout::deactivate(&self.job(), playlist_id).await
    }

    pub async fn reset_playlist(
        &self,
        playlist_id: &PlaylistId,
        options: ResetOptions,
    ) -> CoreResult<Option<ActivationId>> {
        playout::reset_playlist(&self.job(), playlist_id, options).await
    }

    pub async fn take_next_part(
        &self,
        playlist_id: &PlaylistId,
        from_part_instance_id: Option<PartInstanceId>,
    ) -> CoreResult<TakeOutcome> {
        playout::take_next_part(&self.job(), playlist_id, from_part_instance_id).await
    }

    pub async fn set_next_part(&self, playlist_id: &PlaylistId, target: NextTarget) -> CoreResult<PartInstanceId> {
        playout::set_next_part(&self.job(), playlist_id, target).await
    }

    pub async fn move_next_part(
        &self,
        playlist_id: &PlaylistId,
        part_delta: i32,
        segment_delta: i32,
    ) -> CoreResult<Option<PartId>> {
        playout::move_next_part(&self.job(), playlist_id, part_delta, segment_delta).await
    }

    pub async fn ad_lib_piece_start(
        &self,
        playlist_id: &PlaylistId,
        part_instance_id: PartInstanceId,
        adlib_piece_id: AdLibPieceId,
        queue: bool,
    ) -> CoreResult<AdlibOutcome> {
        playout::ad_lib_piece_start(&self.job(), playlist_id, part_instance_id, adlib_piece_id, queue).await
    }

    // -----------------------------------------------------------------------
    // Ingest
    // -----------------------------------------------------------------------

    pub async fn upsert_rundown(&self, studio_id: &StudioId, rundown: IngestRundown) -> CoreResult<RundownId> {
        ingest::upsert_rundown(&self.job(), studio_id, rundown).await
    }

    pub async fn remove_rundown(&self, rundown_id: &RundownId) -> CoreResult<()> {
        ingest::remove_rundown(&self.job(), rundown_id).await
    }

    pub async fn upsert_segment(&self, rundown_id: &RundownId, segment: IngestSegment) -> CoreResult<SegmentId> {
        ingest::upsert_segment(&self.job(), rundown_id, segment).await
    }

    pub async fn remove_segment(&self, rundown_id: &RundownId, segment_external_id: &str) -> CoreResult<()> {
        ingest::remove_segment(&self.job(), rundown_id, segment_external_id).await
    }

    pub async fn move_rundown(
        &self,
        rundown_id: &RundownId,
        target: Option<PlaylistId>,
        order: Vec<RundownId>,
    ) -> CoreResult<PlaylistId> {
        ingest::move_rundown(&self.job(), rundown_id, target, order).await
    }

    pub async fn restore_rundown_order(&self, playlist_id: &PlaylistId) -> CoreResult<Vec<RundownId>> {
        ingest::restore_rundown_order(&self.job(), playlist_id).await
    }

    // -----------------------------------------------------------------------
    // Device gateways
    // -----------------------------------------------------------------------

    pub async fn on_playout_playback_changed(
        &self,
        playlist_id: &PlaylistId,
        changes: Vec<PlayoutChange>,
    ) -> CoreResult<()> {
        playout::on_playout_playback_changed(&self.job(), playlist_id, changes).await
    }

    pub async fn report_resolve_done(
        &self,
        studio_id: &StudioId,
        timeline_hash: &str,
        resolve_duration_ms: i64,
    ) -> CoreResult<Option<ResolveLatency>> {
        telemetry::report_resolve_done(&self.job(), studio_id, timeline_hash, resolve_duration_ms).await
    }

    pub fn timeline_trigger_time(&self, studio_id: &StudioId, results: &[TriggerTimeResult]) {
        telemetry::timeline_trigger_time(&self.template, studio_id, results);
    }

    // -----------------------------------------------------------------------
    // Reads and maintenance
    // -----------------------------------------------------------------------

    /// Current state of a playlist. Reads without taking the lock.
    pub async fn playlist_view(&self, playlist_id: &PlaylistId) -> CoreResult<PlaylistView> {
        let cache = self.template.load_playout_cache(playlist_id).await?;
        let view = |instance: Option<&PartInstance>| {
            instance.map(|pi| InstanceView {
                instance: pi.clone(),
                pieces: cache.piece_instances_of(&pi.id).into_iter().cloned().collect(),
            })
        };
        Ok(PlaylistView {
            playlist: cache.playlist().clone(),
            current: view(cache.current_part_instance()),
            next: view(cache.next_part_instance()),
            previous: view(cache.previous_part_instance()),
        })
    }

    /// The studio's stored timeline, if one was ever generated.
    pub async fn studio_timeline(&self, studio_id: &StudioId) -> CoreResult<Option<TimelineComplete>> {
        fetch_one::<TimelineComplete>(self.template.store.as_ref(), studio_id.as_str())
            .await
            .map_err(|e| CoreError::Persistence(e.to_string()))
    }

    pub async fn cleanup_reset_instances(&self, retention: chrono::Duration) -> CoreResult<CleanupReport> {
        maintenance::cleanup_reset_instances(&self.job(), retention).await
    }
}
