mod common;

use assert_matches::assert_matches;
use common::Harness;
use onair_core::error::{CoreError, ErrorKind, UserErrorCode};
use onair_core::instance::PartInstance;
use onair_core::playback::PlayoutChange;
use onair_core::timeline::TimelineTime;
use onair_playout::timeline::part_group_id;
use onair_db::Collection;
use onair_playout::{ActivationMode, NextTarget, PlayoutSettings, ResetOptions};

#[tokio::test]
async fn activation_selects_first_part_as_next() {
    let h = Harness::new();
    h.ingest_show(false).await;

    h.engine.activate(&h.playlist_id(), false, false).await.unwrap();

    let view = h.view().await;
    assert!(view.playlist.is_active());
    assert!(view.current.is_none());
    assert_eq!(h.next_part().await, Some(h.part_id("show", "a")));
    assert_eq!(view.next.unwrap().pieces.len(), 1);
}

#[tokio::test]
async fn take_advances_current_and_next() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();

    let first = h.engine.take_next_part(&playlist, None).await.unwrap();
    assert_eq!(h.current_part().await, Some(h.part_id("show", "a")));
    assert_eq!(h.next_part().await, Some(h.part_id("show", "b")));

    h.advance_ms(5_000);
    let second = h
        .engine
        .take_next_part(&playlist, Some(first.current_part_instance_id.clone()))
        .await
        .unwrap();
    assert_eq!(second.previous_part_instance_id, Some(first.current_part_instance_id));
    assert_eq!(h.current_part().await, Some(h.part_id("show", "b")));
    assert_eq!(h.next_part().await, Some(h.part_id("show", "c")));
}

#[tokio::test]
async fn take_with_stale_current_is_a_conflict() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    h.engine.take_next_part(&playlist, None).await.unwrap();
    h.advance_ms(5_000);

    let err = h.engine.take_next_part(&playlist, None).await.unwrap_err();
    assert_matches!(
        err,
        CoreError::User {
            code: UserErrorCode::TakeFromIncorrectPart,
            ..
        }
    );
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.current_part().await, Some(h.part_id("show", "a")));
}

#[tokio::test]
async fn take_while_inactive_is_refused() {
    let h = Harness::new();
    h.ingest_show(false).await;

    let err = h.engine.take_next_part(&h.playlist_id(), None).await.unwrap_err();
    assert_matches!(
        err,
        CoreError::User {
            code: UserErrorCode::InactiveRundown,
            ..
        }
    );
}

#[tokio::test]
async fn takes_are_rate_limited() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    let first = h.engine.take_next_part(&playlist, None).await.unwrap();

    h.advance_ms(500);
    let err = h
        .engine
        .take_next_part(&playlist, Some(first.current_part_instance_id.clone()))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        CoreError::User {
            code: UserErrorCode::TakeRateLimit,
            ..
        }
    );
    assert_eq!(err.kind(), ErrorKind::Timing);

    h.advance_ms(600);
    h.engine
        .take_next_part(&playlist, Some(first.current_part_instance_id))
        .await
        .unwrap();
}

#[tokio::test]
async fn take_close_to_autonext_is_refused() {
    let h = Harness::new();
    h.ingest_show(true).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    let first = h.engine.take_next_part(&playlist, None).await.unwrap();

    h.advance_ms(29_500);
    let err = h
        .engine
        .take_next_part(&playlist, Some(first.current_part_instance_id))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        CoreError::User {
            code: UserErrorCode::TakeCloseToAutonext,
            ..
        }
    );
}

#[tokio::test]
async fn device_autonext_completes_the_take() {
    let h = Harness::new();
    h.ingest_show(true).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    let taken_at = h.now();
    let outcome = h.engine.take_next_part(&playlist, None).await.unwrap();
    let a = outcome.current_part_instance_id.clone();
    let b = outcome.next_part_instance_id.clone().unwrap();

    // The next part is scheduled at the planned end of A.
    let timeline = h.engine.studio_timeline(&h.studio).await.unwrap().unwrap();
    let view = h.view().await;
    let next_group = part_group_id(&view.next.unwrap().instance);
    let group = timeline.objects.iter().find(|o| o.id == next_group).unwrap();
    let autonext_at = taken_at + chrono::Duration::seconds(30);
    assert_eq!(group.enable.start, TimelineTime::at(autonext_at));

    let reported = h.advance_ms(30_000);
    h.engine
        .on_playout_playback_changed(
            &playlist,
            vec![
                PlayoutChange::PartPlaybackStopped {
                    part_instance_id: a.clone(),
                    time: reported,
                },
                PlayoutChange::PartPlaybackStarted {
                    part_instance_id: b.clone(),
                    time: reported,
                },
            ],
        )
        .await
        .unwrap();

    let view = h.view().await;
    assert_eq!(view.current.as_ref().unwrap().instance.id, b);
    assert_eq!(view.current.unwrap().instance.timings.take, Some(reported));
    assert_eq!(view.next.unwrap().instance.part.id, h.part_id("show", "c"));
    let previous = view.previous.unwrap().instance;
    assert_eq!(previous.id, a);
    assert_eq!(previous.timings.stopped_playback, Some(reported));
    assert_eq!(view.playlist.started_playback, Some(reported));
}

#[tokio::test]
async fn playback_reports_keep_the_latest_time() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    let a = h.engine.take_next_part(&playlist, None).await.unwrap().current_part_instance_id;

    let early = h.now();
    let late = h.advance_ms(200);
    h.engine
        .on_playout_playback_changed(
            &playlist,
            vec![PlayoutChange::PartPlaybackStarted {
                part_instance_id: a.clone(),
                time: late,
            }],
        )
        .await
        .unwrap();
    h.engine
        .on_playout_playback_changed(
            &playlist,
            vec![PlayoutChange::PartPlaybackStarted {
                part_instance_id: a,
                time: early,
            }],
        )
        .await
        .unwrap();

    let current = h.view().await.current.unwrap().instance;
    assert_eq!(current.timings.started_playback, Some(late));
}

#[tokio::test]
async fn unknown_instances_in_playback_reports_are_ignored() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();

    h.engine
        .on_playout_playback_changed(
            &playlist,
            vec![PlayoutChange::PartPlaybackStarted {
                part_instance_id: "missing".into(),
                time: h.now(),
            }],
        )
        .await
        .unwrap();
    assert!(h.view().await.current.is_none());
}

#[tokio::test]
async fn next_cannot_be_the_current_part() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    h.engine.take_next_part(&playlist, None).await.unwrap();

    let err = h
        .engine
        .set_next_part(&playlist, NextTarget::Part(h.part_id("show", "a")))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        CoreError::User {
            code: UserErrorCode::SetNextToCurrentPart,
            ..
        }
    );

    h.engine
        .set_next_part(&playlist, NextTarget::Part(h.part_id("show", "c")))
        .await
        .unwrap();
    let view = h.view().await;
    assert_eq!(view.next.unwrap().instance.part.id, h.part_id("show", "c"));
    assert!(view.playlist.next_part_manual);
}

#[tokio::test]
async fn unknown_part_cannot_be_set_next() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();

    let err = h
        .engine
        .set_next_part(&playlist, NextTarget::Part("nope".into()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn move_next_steps_over_segments() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();

    let moved = h.engine.move_next_part(&playlist, 0, 1).await.unwrap();
    assert_eq!(moved, Some(h.part_id("show", "c")));
    let moved = h.engine.move_next_part(&playlist, -1, 0).await.unwrap();
    assert_eq!(moved, Some(h.part_id("show", "b")));
}

#[tokio::test]
async fn move_next_clamps_beside_the_current_part() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    h.engine.take_next_part(&playlist, None).await.unwrap();

    // A is current and first; stepping back has nowhere to go.
    let moved = h.engine.move_next_part(&playlist, -1, 0).await.unwrap();
    assert_eq!(moved, Some(h.part_id("show", "b")));
    let moved = h.engine.move_next_part(&playlist, -5, -2).await.unwrap();
    assert_eq!(moved, Some(h.part_id("show", "b")));
    assert_eq!(h.next_part().await, Some(h.part_id("show", "b")));
}

#[tokio::test]
async fn activation_is_exclusive_within_a_studio() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let late_show = h.ingest_show_into("late", "late-show").await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();

    let err = h.engine.activate(&late_show, false, false).await.unwrap_err();
    assert_matches!(
        err,
        CoreError::User {
            code: UserErrorCode::RundownAlreadyActiveNames,
            ..
        }
    );
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    h.engine.activate(&late_show, false, true).await.unwrap();
    assert!(!h.view().await.playlist.is_active());
    let late = h.engine.playlist_view(&late_show).await.unwrap();
    assert!(late.playlist.is_active());
}

#[tokio::test]
async fn deactivate_keeps_history_and_stops_output() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    let taken = h.engine.take_next_part(&playlist, None).await.unwrap().current_part_instance_id;

    h.engine.deactivate(&playlist).await.unwrap();
    h.engine.deactivate(&playlist).await.unwrap();

    let view = h.view().await;
    assert!(!view.playlist.is_active());
    assert!(view.current.is_none());
    assert!(view.next.is_none());

    let instances: Vec<PartInstance> = h
        .store
        .documents(Collection::PartInstances)
        .await
        .into_iter()
        .map(|doc| serde_json::from_value(doc.body).unwrap())
        .collect();
    let history = instances.iter().find(|pi| pi.id == taken).unwrap();
    assert!(history.is_taken);
    assert!(!history.is_reset());
    assert!(history.timings.take_out.is_some());

    let timeline = h.engine.studio_timeline(&h.studio).await.unwrap().unwrap();
    assert_eq!(timeline.playlist_id, None);
    assert!(timeline.objects.is_empty());
}

#[tokio::test]
async fn deactivating_one_playlist_keeps_the_other_on_air() {
    let h = Harness::with_settings(PlayoutSettings {
        allow_multiple_active_playlists: true,
        ..Default::default()
    });
    h.ingest_show(false).await;
    let late_show = h.ingest_show_into("late", "late-show").await;
    let playlist = h.playlist_id();

    h.engine.activate(&playlist, false, false).await.unwrap();
    let current = h.engine.take_next_part(&playlist, None).await.unwrap().current_part_instance_id;
    h.engine.activate(&late_show, false, false).await.unwrap();
    h.engine.take_next_part(&late_show, None).await.unwrap();

    h.engine.deactivate(&late_show).await.unwrap();
    assert!(h.view().await.playlist.is_active());
    let timeline = h.engine.studio_timeline(&h.studio).await.unwrap().unwrap();
    assert!(timeline.playlist_id.is_some());
    assert!(!timeline.objects.is_empty());

    // The remaining playlist takes the studio output over on its next job.
    h.advance_ms(5_000);
    h.engine.take_next_part(&playlist, Some(current)).await.unwrap();
    let timeline = h.engine.studio_timeline(&h.studio).await.unwrap().unwrap();
    assert_eq!(timeline.playlist_id, Some(playlist));
}

#[tokio::test]
async fn reset_on_air_requires_force() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    h.engine.take_next_part(&playlist, None).await.unwrap();

    let err = h
        .engine
        .reset_playlist(&playlist, ResetOptions::default())
        .await
        .unwrap_err();
    assert_matches!(
        err,
        CoreError::User {
            code: UserErrorCode::RundownResetWhileActive,
            ..
        }
    );

    let activation = h
        .engine
        .reset_playlist(
            &playlist,
            ResetOptions {
                force: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(activation.is_some());
    assert!(h.current_part().await.is_none());
    assert_eq!(h.next_part().await, Some(h.part_id("show", "a")));
}

#[tokio::test]
async fn reset_in_rehearsal_needs_no_force() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, true, false).await.unwrap();
    h.engine.take_next_part(&playlist, None).await.unwrap();

    h.engine
        .reset_playlist(&playlist, ResetOptions::default())
        .await
        .unwrap();
    let view = h.view().await;
    assert!(view.playlist.rehearsal);
    assert!(view.current.is_none());
}

#[tokio::test]
async fn reset_on_air_allowed_by_setting() {
    let h = Harness::with_settings(PlayoutSettings {
        allow_reset_on_air: true,
        ..Default::default()
    });
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    h.engine.take_next_part(&playlist, None).await.unwrap();

    h.engine
        .reset_playlist(&playlist, ResetOptions::default())
        .await
        .unwrap();
    let view = h.view().await;
    assert!(view.playlist.is_on_air());
    assert!(view.current.is_none());
}

#[tokio::test]
async fn reset_with_activation_switches_mode() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    h.engine.take_next_part(&playlist, None).await.unwrap();

    h.engine
        .reset_playlist(
            &playlist,
            ResetOptions {
                activate: Some(ActivationMode::Rehearsal),
                force: false,
            },
        )
        .await
        .unwrap();
    assert!(h.view().await.playlist.rehearsal);
}

#[tokio::test]
async fn prepare_for_broadcast_refuses_an_active_playlist() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    let mut events = h.bus.subscribe();

    h.engine.prepare_for_broadcast(&playlist).await.unwrap();
    assert!(h.view().await.playlist.rehearsal);

    let mut saw_make_ready = false;
    while let Ok(event) = events.try_recv() {
        saw_make_ready |= event.event_type == onair_events::event_types::DEVICES_MAKE_READY;
    }
    assert!(saw_make_ready);

    let err = h.engine.prepare_for_broadcast(&playlist).await.unwrap_err();
    assert_matches!(
        err,
        CoreError::User {
            code: UserErrorCode::RundownAlreadyActive,
            ..
        }
    );
}

#[tokio::test]
async fn queued_adlib_becomes_next() {
    let h = Harness::new();
    h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    let current = h.engine.take_next_part(&playlist, None).await.unwrap().current_part_instance_id;
    let adlib = onair_core::ids::AdLibPieceId::derived(&[h.part_id("show", "a").as_str(), "a-gfx"]);

    let outcome = h
        .engine
        .ad_lib_piece_start(&playlist, current.clone(), adlib.clone(), true)
        .await
        .unwrap();
    assert!(outcome.queued);

    let view = h.view().await;
    let next = view.next.unwrap();
    assert_eq!(next.instance.id, outcome.part_instance_id);
    assert_eq!(
        next.instance.orphan_reason(),
        Some(onair_core::instance::OrphanReason::AdlibPart)
    );
    assert!(next.pieces.iter().any(|p| p.adlib_source_id.as_ref() == Some(&adlib)));

    // An inline ad-lib lands in the current part.
    let inline = h
        .engine
        .ad_lib_piece_start(&playlist, current, adlib, false)
        .await
        .unwrap();
    assert!(!inline.queued);
    let pieces = h.view().await.current.unwrap().pieces;
    assert!(pieces.iter().any(|p| p.id == inline.piece_instance_id));
}
