mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{part_json, segment, show, Harness, PLAYLIST_EXTERNAL_ID};
use onair_core::error::{CoreError, UserErrorCode};
use onair_core::ids::{RundownId, ShowStyleVariantId};
use onair_core::ingest::IngestRundown;
use onair_core::instance::OrphanReason;
use onair_core::rundown::Rundown;
use onair_db::cache::fetch_one;
use onair_db::{Collection, DocumentStore};
use onair_playout::{Blueprint, BlueprintContext, BlueprintError, PlayoutSettings};

async fn stored_rundown(h: &Harness, id: &RundownId) -> Option<Rundown> {
    fetch_one::<Rundown>(h.store.as_ref() as &dyn DocumentStore, id.as_str())
        .await
        .unwrap()
}

#[tokio::test]
async fn upsert_creates_playlist_and_rundown() {
    let h = Harness::new();
    let rundown_id = h.ingest_show(false).await;

    let view = h.view().await;
    assert_eq!(view.playlist.rundown_ids, vec![rundown_id.clone()]);
    assert_eq!(view.playlist.external_id, PLAYLIST_EXTERNAL_ID);

    let rundown = stored_rundown(&h, &rundown_id).await.unwrap();
    assert_eq!(rundown.playlist_id, h.playlist_id());
    assert_eq!(rundown.show_style_variant_id, Some(ShowStyleVariantId::new("default")));
    assert_eq!(h.store.documents(Collection::Parts).await.len(), 3);
}

#[tokio::test]
async fn reingest_updates_in_place() {
    let h = Harness::new();
    h.ingest_show(false).await;
    h.ingest_show(false).await;

    assert_eq!(h.store.documents(Collection::Playlists).await.len(), 1);
    assert_eq!(h.store.documents(Collection::Rundowns).await.len(), 1);
    assert_eq!(h.store.documents(Collection::Parts).await.len(), 3);
    assert_eq!(h.store.documents(Collection::Pieces).await.len(), 3);
}

#[tokio::test]
async fn invalid_change_set_is_rejected() {
    let h = Harness::new();
    let mut rundown = show("show", false);
    rundown.external_id.clear();

    let err = h.engine.upsert_rundown(&h.studio, rundown).await.unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
    assert!(h.store.documents(Collection::Playlists).await.is_empty());
}

#[tokio::test]
async fn removing_the_on_air_part_orphans_its_instance() {
    let h = Harness::new();
    let rundown_id = h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    let a = h.engine.take_next_part(&playlist, None).await.unwrap().current_part_instance_id;

    h.engine
        .upsert_segment(&rundown_id, segment("seg-1", 0.0, vec![part_json("b", 1.0, false)]))
        .await
        .unwrap();

    let view = h.view().await;
    let current = view.current.unwrap();
    assert_eq!(current.instance.id, a);
    assert_eq!(current.instance.orphan_reason(), Some(OrphanReason::Deleted));
    assert!(current.instance.rank() < 1.0);
    assert_eq!(view.next.unwrap().instance.part.id, h.part_id("show", "b"));
}

#[tokio::test]
async fn removing_the_next_part_reselects_next() {
    let h = Harness::new();
    let rundown_id = h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    h.engine.take_next_part(&playlist, None).await.unwrap();

    h.engine
        .upsert_segment(&rundown_id, segment("seg-1", 0.0, vec![part_json("a", 0.0, false)]))
        .await
        .unwrap();

    assert_eq!(h.current_part().await, Some(h.part_id("show", "a")));
    assert_eq!(h.next_part().await, Some(h.part_id("show", "c")));
}

#[tokio::test]
async fn manual_next_survives_unrelated_edits() {
    let h = Harness::new();
    let rundown_id = h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    h.engine
        .set_next_part(&playlist, onair_playout::NextTarget::Part(h.part_id("show", "c")))
        .await
        .unwrap();

    h.engine
        .upsert_segment(
            &rundown_id,
            segment(
                "seg-1",
                0.0,
                vec![part_json("a", 0.0, false), part_json("b", 1.0, false), part_json("b2", 2.0, false)],
            ),
        )
        .await
        .unwrap();

    let view = h.view().await;
    assert!(view.playlist.next_part_manual);
    assert_eq!(view.next.unwrap().instance.part.id, h.part_id("show", "c"));
}

#[tokio::test]
async fn removing_a_segment_requires_it_to_exist() {
    let h = Harness::new();
    let rundown_id = h.ingest_show(false).await;

    let err = h.engine.remove_segment(&rundown_id, "nope").await.unwrap_err();
    assert_matches!(
        err,
        CoreError::NotFound {
            code: UserErrorCode::SegmentNotFound,
            ..
        }
    );

    h.engine.remove_segment(&rundown_id, "seg-2").await.unwrap();
    assert_eq!(h.store.documents(Collection::Parts).await.len(), 2);
}

#[tokio::test]
async fn on_air_rundown_cannot_be_removed() {
    let h = Harness::new();
    let rundown_id = h.ingest_show(false).await;
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();
    h.engine.take_next_part(&playlist, None).await.unwrap();

    let err = h.engine.remove_rundown(&rundown_id).await.unwrap_err();
    assert_matches!(
        err,
        CoreError::User {
            code: UserErrorCode::RundownRemoveWhileOnAir,
            ..
        }
    );
    assert!(stored_rundown(&h, &rundown_id).await.is_some());
}

#[tokio::test]
async fn removing_the_last_rundown_removes_the_playlist() {
    let h = Harness::new();
    let rundown_id = h.ingest_show(false).await;

    h.engine.remove_rundown(&rundown_id).await.unwrap();

    assert!(stored_rundown(&h, &rundown_id).await.is_none());
    assert!(h.store.documents(Collection::Playlists).await.is_empty());
    assert!(h.store.documents(Collection::Parts).await.is_empty());
}

#[tokio::test]
async fn rundowns_move_between_playlists() {
    let h = Harness::new();
    let first = h.ingest_show(false).await;
    let second = h.engine.upsert_rundown(&h.studio, show("late", false)).await.unwrap();
    assert_eq!(h.view().await.playlist.rundown_ids, vec![first.clone(), second.clone()]);

    let target = h.engine.move_rundown(&second, None, Vec::new()).await.unwrap();
    assert_ne!(target, h.playlist_id());
    assert_eq!(h.view().await.playlist.rundown_ids, vec![first.clone()]);
    assert_eq!(stored_rundown(&h, &second).await.unwrap().playlist_id, target);

    // Moving it back with an explicit order.
    h.engine
        .move_rundown(&second, Some(h.playlist_id()), vec![second.clone(), first.clone()])
        .await
        .unwrap();
    assert_eq!(h.view().await.playlist.rundown_ids, vec![second, first]);
    assert_eq!(h.store.documents(Collection::Playlists).await.len(), 1);
}

#[tokio::test]
async fn on_air_rundown_cannot_be_moved() {
    let h = Harness::new();
    let first = h.ingest_show(false).await;
    h.engine.upsert_rundown(&h.studio, show("late", false)).await.unwrap();
    let playlist = h.playlist_id();
    h.engine.activate(&playlist, false, false).await.unwrap();

    let err = h.engine.move_rundown(&first, None, Vec::new()).await.unwrap_err();
    assert_matches!(
        err,
        CoreError::User {
            code: UserErrorCode::RundownMoveWhileOnAir,
            ..
        }
    );
}

#[tokio::test]
async fn restore_order_sorts_by_expected_start() {
    let h = Harness::new();
    let start = common::start_time();
    let mut late: IngestRundown = show("late", false);
    late.expected_start = Some(start + chrono::Duration::hours(2));
    let mut early: IngestRundown = show("early", false);
    early.expected_start = Some(start + chrono::Duration::hours(1));

    let late = h.engine.upsert_rundown(&h.studio, late).await.unwrap();
    let early = h.engine.upsert_rundown(&h.studio, early).await.unwrap();
    h.engine
        .move_rundown(&early, Some(h.playlist_id()), vec![late.clone(), early.clone()])
        .await
        .unwrap();

    let order = h.engine.restore_rundown_order(&h.playlist_id()).await.unwrap();
    assert_eq!(order, vec![early, late]);
}

struct FailingBlueprint;

impl Blueprint for FailingBlueprint {
    fn get_show_style_variant_id(
        &self,
        _context: &BlueprintContext,
        _variants: &[ShowStyleVariantId],
        _rundown: &IngestRundown,
    ) -> Result<Option<ShowStyleVariantId>, BlueprintError> {
        Err(BlueprintError("no show style matches".into()))
    }
}

#[tokio::test]
async fn blueprint_failure_does_not_block_ingest() {
    let h = Harness::build(PlayoutSettings::default(), Arc::new(FailingBlueprint));
    let rundown_id = h.ingest_show(false).await;

    let rundown = stored_rundown(&h, &rundown_id).await.unwrap();
    assert_eq!(rundown.show_style_variant_id, None);
}
