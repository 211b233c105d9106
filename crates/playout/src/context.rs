//! Job context and the lock → load → mutate → flush discipline.

use std::sync::Arc;
use std::ops::Range;
use std::time::{Duration, Instant};

use onair_core::clock::Clock;
use onair_core::error::{CoreError, CoreResult, UserErrorCode};
use onair_core::ids::{PlaylistId, StudioId};
use onair_core::types::Timestamp;
use onair_db::cache::{CacheError, PlayoutCache, SaveSummary, StudioCache};
use onair_db::store::{Collection, DocumentStore};
use onair_events::{event_types, EventBus, PlayoutEvent};
use rand::Rng;

use crate::blueprint::Blueprint;
use crate::config::PlayoutSettings;
use crate::lock::{JobId, LockGuard, LockKey, LockManager, LockPriority};
use crate::timeline::update_studio_timeline;

/// Random pause before retrying a timed-out lock.
const RETRY_JITTER_MS: Range<u64> = 10..60;

/// Everything one job needs, passed explicitly.
///
/// Cloning keeps the job id, so nested calls re-enter locks the job
/// already holds. [`JobContext::next_job`] starts a new identity.
#[derive(Clone)]
pub struct JobContext {
    pub store: Arc<dyn DocumentStore>,
    pub locks: Arc<LockManager>,
    pub clock: Arc<dyn Clock>,
    pub bus: Arc<EventBus>,
    pub settings: Arc<PlayoutSettings>,
    pub blueprint: Arc<dyn Blueprint>,
    pub job_id: JobId,
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("job_id", &self.job_id)
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl JobContext {
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Same dependencies, new job identity.
    pub fn next_job(&self) -> Self {
        Self {
            job_id: JobId::new(),
            ..self.clone()
        }
    }

    /// Acquire a lock, retrying `LockTimeout` up to the configured count.
    pub async fn lock(&self, key: LockKey, priority: LockPriority) -> CoreResult<LockGuard> {
        let attempts = self.settings.lock_retry_attempts;
        let mut attempt = 0;
        loop {
            match self
                .locks
                .acquire(key.clone(), priority, self.job_id, self.settings.lock_timeout)
                .await
            {
                Err(CoreError::LockTimeout { .. }) if attempt < attempts => {
                    attempt += 1;
                    let backoff = Duration::from_millis(rand::rng().random_range(RETRY_JITTER_MS));
                    tracing::warn!(
                        lock = %key,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "Lock timed out, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }
    }

    /// Run a mutating job on one playlist.
    ///
    /// Holds the playlist lock from before the load until after the flush.
    /// On success the studio timeline is regenerated, the cache is saved
    /// in one commit and change events are published. On error nothing is
    /// written.
    pub async fn run_playlist_job<T>(
        &self,
        playlist_id: &PlaylistId,
        priority: LockPriority,
        name: &'static str,
        job: impl FnOnce(&mut PlayoutCache, &JobContext) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let started = Instant::now();
        let _guard = self.lock(LockKey::Playlist(playlist_id.clone()), priority).await?;
        tracing::debug!(
            job = name,
            playlist_id = %playlist_id,
            job_id = %self.job_id,
            waited_ms = started.elapsed().as_millis() as u64,
            "Playlist job started"
        );

        let mut cache = self.load_playout_cache(playlist_id).await?;

        let output = match job(&mut cache, self) {
            Ok(output) => output,
            Err(e) => {
                tracing::info!(
                    job = name,
                    playlist_id = %playlist_id,
                    code = e.code(),
                    error = %e,
                    "Playlist job rejected"
                );
                return Err(e);
            }
        };

        update_studio_timeline(&mut cache, self.now());
        self.flush_playout(&mut cache, name).await?;

        tracing::debug!(
            job = name,
            playlist_id = %playlist_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Playlist job finished"
        );
        Ok(output)
    }

    /// Run a job on a studio's playlists and rundowns under the studio lock.
    pub async fn run_studio_job<T>(
        &self,
        studio_id: &StudioId,
        priority: LockPriority,
        name: &'static str,
        job: impl FnOnce(&mut StudioCache, &JobContext) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let _guard = self.lock(LockKey::Studio(studio_id.clone()), priority).await?;
        let mut cache = StudioCache::load(self.store.as_ref(), studio_id)
            .await
            .map_err(|e| persistence(name, e))?;

        let output = job(&mut cache, self)?;

        cache.save(self.store.as_ref()).await.map_err(|e| {
            tracing::error!(job = name, studio_id = %studio_id, error = %e, "Studio flush failed");
            persistence(name, e)
        })?;
        Ok(output)
    }

    /// Load a playout cache without taking a lock, for read APIs.
    pub async fn load_playout_cache(&self, playlist_id: &PlaylistId) -> CoreResult<PlayoutCache> {
        PlayoutCache::load(self.store.as_ref(), playlist_id)
            .await
            .map_err(|e| match e {
                CacheError::PlaylistNotFound(id) => {
                    CoreError::not_found(UserErrorCode::PlaylistNotFound, "Playlist", id)
                }
                other => {
                    tracing::error!(playlist_id = %playlist_id, error = %other, "Cache load failed");
                    CoreError::Persistence(other.to_string())
                }
            })
    }

    async fn flush_playout(&self, cache: &mut PlayoutCache, name: &'static str) -> CoreResult<()> {
        let summary = cache.save(self.store.as_ref()).await.map_err(|e| {
            tracing::error!(
                job = name,
                playlist_id = %cache.playlist_id,
                error = %e,
                "Playlist flush failed"
            );
            persistence(name, e)
        })?;
        self.publish_changes(cache, &summary);
        Ok(())
    }

    fn publish_changes(&self, cache: &PlayoutCache, summary: &SaveSummary) {
        if summary.is_empty() {
            return;
        }
        let now = self.now();
        let collections: Vec<&str> = summary.collections.iter().map(|c| c.as_str()).collect();
        self.bus.publish(
            PlayoutEvent::new(event_types::PLAYLIST_CHANGED)
                .with_studio(cache.studio_id.clone())
                .with_playlist(cache.playlist_id.clone())
                .with_payload(serde_json::json!({ "collections": collections }))
                .at(now),
        );

        if summary.touched(Collection::Timelines) {
            if let Some(timeline) = cache.timeline.iter().next() {
                match serde_json::to_value(timeline) {
                    Ok(payload) => self.bus.publish(
                        PlayoutEvent::new(event_types::TIMELINE_UPDATED)
                            .with_studio(cache.studio_id.clone())
                            .with_playlist(cache.playlist_id.clone())
                            .with_payload(payload)
                            .at(now),
                    ),
                    Err(e) => tracing::error!(error = %e, "Failed to encode timeline event"),
                }
            }
        }
    }
}

fn persistence(job: &str, e: CacheError) -> CoreError {
    CoreError::Persistence(format!("{job}: {e}"))
}
