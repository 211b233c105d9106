//! Activation, deactivation and reset.

use onair_core::error::{CoreError, CoreResult, UserErrorCode};
use onair_core::ids::{ActivationId, PlaylistId, StudioId};
use onair_core::playlist::RundownPlaylist;
use onair_core::types::Timestamp;
use onair_db::cache::{fetch, fetch_one, PlayoutCache};
use onair_db::store::{Collection, DocumentQuery};
use onair_events::{event_types, PlayoutEvent};
use serde::{Deserialize, Serialize};

use super::select_next_auto;
use crate::context::JobContext;
use crate::instances::{live_part_instances, reset_part_instance};
use crate::lock::{LockKey, LockPriority};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    Rehearsal,
    Active,
}

impl ActivationMode {
    pub fn is_rehearsal(self) -> bool {
        matches!(self, Self::Rehearsal)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ResetOptions {
    /// Re-activate in the same job after resetting.
    #[serde(default)]
    pub activate: Option<ActivationMode>,
    /// Reset even while live on air.
    #[serde(default)]
    pub force: bool,
}

/// Studio of a playlist, read outside any lock.
pub(crate) async fn studio_of(ctx: &JobContext, playlist_id: &PlaylistId) -> CoreResult<StudioId> {
    fetch_one::<RundownPlaylist>(ctx.store.as_ref(), playlist_id.as_str())
        .await
        .map_err(|e| CoreError::Persistence(e.to_string()))?
        .map(|p| p.studio_id)
        .ok_or_else(|| CoreError::not_found(UserErrorCode::PlaylistNotFound, "Playlist", playlist_id))
}

/// Deactivate every other active playlist in the studio.
async fn deactivate_others(
    ctx: &JobContext,
    studio_id: &StudioId,
    keep: &PlaylistId,
) -> CoreResult<()> {
    let playlists: Vec<RundownPlaylist> = fetch(
        ctx.store.as_ref(),
        DocumentQuery::live(Collection::Playlists, vec![studio_id.to_string()]),
    )
    .await
    .map_err(|e| CoreError::Persistence(e.to_string()))?;

    for other in playlists.iter().filter(|p| p.id != *keep && p.is_active()) {
        tracing::info!(
            playlist_id = %other.id,
            activating = %keep,
            "Deactivating playlist for forced activation"
        );
        deactivate(ctx, &other.id).await?;
    }
    Ok(())
}

pub(crate) fn activate_in_cache(
    cache: &mut PlayoutCache,
    ctx: &JobContext,
    rehearsal: bool,
) -> CoreResult<ActivationId> {
    if !ctx.settings.allow_multiple_active_playlists {
        let active: Vec<&str> = cache
            .studio_playlists
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.name.as_str())
            .collect();
        if !active.is_empty() {
            return Err(CoreError::user(
                UserErrorCode::RundownAlreadyActiveNames,
                format!(
                    "Another playlist is already active in this studio: {}",
                    active.join(", ")
                ),
            ));
        }
    }

    let now = ctx.now();
    if let Some(existing) = cache.playlist().activation_id.clone() {
        if cache.playlist().rehearsal != rehearsal {
            tracing::info!(playlist_id = %cache.playlist_id, rehearsal, "Switching rehearsal mode");
            cache.update_playlist(|pl| {
                pl.rehearsal = rehearsal;
                pl.modified_at = now;
            });
        }
        return Ok(existing);
    }

    let activation = ActivationId::generate();
    cache.update_playlist(|pl| {
        pl.activation_id = Some(activation.clone());
        pl.rehearsal = rehearsal;
        pl.clear_pointers();
        pl.started_playback = None;
        pl.last_take_time = None;
        pl.modified_at = now;
    });
    let next = select_next_auto(cache, &activation, now);

    tracing::info!(
        playlist_id = %cache.playlist_id,
        activation_id = %activation,
        rehearsal,
        next = ?next,
        "Playlist activated"
    );
    Ok(activation)
}

pub(crate) fn deactivate_in_cache(cache: &mut PlayoutCache, now: Timestamp) {
    if !cache.playlist().is_active() {
        tracing::debug!(playlist_id = %cache.playlist_id, "Playlist already inactive");
        return;
    }
    if let Some(current) = cache.playlist().current_part_instance_id.clone() {
        cache.part_instances.update(&current, |pi| {
            if pi.timings.take_out.is_none() {
                pi.timings.take_out = Some(now);
            }
        });
    }
    cache.update_playlist(|pl| {
        pl.activation_id = None;
        pl.rehearsal = false;
        pl.clear_pointers();
        pl.modified_at = now;
    });
    tracing::info!(playlist_id = %cache.playlist_id, "Playlist deactivated");
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Activate a playlist. With `force`, other active playlists of the
/// studio are deactivated first instead of failing.
pub async fn activate(
    ctx: &JobContext,
    playlist_id: &PlaylistId,
    rehearsal: bool,
    force: bool,
) -> CoreResult<ActivationId> {
    let studio_id = studio_of(ctx, playlist_id).await?;
    let _studio = ctx
        .lock(LockKey::Studio(studio_id.clone()), LockPriority::UserPlayout)
        .await?;
    if force && !ctx.settings.allow_multiple_active_playlists {
        deactivate_others(ctx, &studio_id, playlist_id).await?;
    }
    ctx.run_playlist_job(playlist_id, LockPriority::UserPlayout, "activate", move |cache, ctx| {
        activate_in_cache(cache, ctx, rehearsal)
    })
    .await
}

/// Activate in rehearsal and ask gateways to ready their devices.
pub async fn prepare_for_broadcast(
    ctx: &JobContext,
    playlist_id: &PlaylistId,
) -> CoreResult<ActivationId> {
    let studio_id = studio_of(ctx, playlist_id).await?;
    let _studio = ctx
        .lock(LockKey::Studio(studio_id.clone()), LockPriority::UserPlayout)
        .await?;
    let activation = ctx
        .run_playlist_job(playlist_id, LockPriority::UserPlayout, "prepare_for_broadcast", |cache, ctx| {
            if cache.playlist().is_active() {
                return Err(CoreError::user(
                    UserErrorCode::RundownAlreadyActive,
                    format!("Playlist \"{}\" is already active", cache.playlist().name),
                ));
            }
            activate_in_cache(cache, ctx, true)
        })
        .await?;

    ctx.bus.publish(
        PlayoutEvent::new(event_types::DEVICES_MAKE_READY)
            .with_studio(studio_id)
            .with_playlist(playlist_id.clone())
            .with_payload(serde_json::json!({ "activation_id": activation }))
            .at(ctx.now()),
    );
    Ok(activation)
}

/// Deactivate a playlist. Instances are kept as history. Idempotent.
pub async fn deactivate(ctx: &JobContext, playlist_id: &PlaylistId) -> CoreResult<()> {
    ctx.run_playlist_job(playlist_id, LockPriority::UserPlayout, "deactivate", |cache, ctx| {
        deactivate_in_cache(cache, ctx.now());
        Ok(())
    })
    .await
}

/// Soft-reset every live instance of the playlist and clear its pointers.
///
/// A playlist that was active stays active under a new activation. Returns
/// the activation id when the playlist ends up active.
pub async fn reset_playlist(
    ctx: &JobContext,
    playlist_id: &PlaylistId,
    options: ResetOptions,
) -> CoreResult<Option<ActivationId>> {
    let _studio = match options.activate {
        Some(_) => {
            let studio_id = studio_of(ctx, playlist_id).await?;
            Some(ctx.lock(LockKey::Studio(studio_id), LockPriority::UserPlayout).await?)
        }
        None => None,
    };

    ctx.run_playlist_job(playlist_id, LockPriority::UserPlayout, "reset_playlist", move |cache, ctx| {
        let playlist = cache.playlist();
        let allowed = options.force || ctx.settings.allow_reset_on_air || options.activate.is_some();
        if playlist.is_on_air() && !allowed {
            return Err(CoreError::user(
                UserErrorCode::RundownResetWhileActive,
                format!("Playlist \"{}\" is on air and cannot be reset", playlist.name),
            ));
        }
        let resume = playlist.activation_id.as_ref().map(|_| playlist.rehearsal);

        let now = ctx.now();
        let ids: Vec<_> = live_part_instances(cache).map(|pi| pi.id.clone()).collect();
        for id in &ids {
            reset_part_instance(cache, id, now);
        }
        cache.update_playlist(|pl| {
            pl.activation_id = None;
            pl.clear_pointers();
            pl.started_playback = None;
            pl.last_take_time = None;
            pl.modified_at = now;
        });
        tracing::info!(
            playlist_id = %cache.playlist_id,
            reset_instances = ids.len(),
            "Playlist reset"
        );

        let rehearsal = options.activate.map(ActivationMode::is_rehearsal).or(resume);
        match rehearsal {
            Some(rehearsal) => activate_in_cache(cache, ctx, rehearsal).map(Some),
            None => Ok(None),
        }
    })
    .await
}
