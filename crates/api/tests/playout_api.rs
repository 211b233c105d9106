//! End-to-end operator and ingest flows through the HTTP surface.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, build_test_app, delete, get, ingest_show, post_json, send_json};
use onair_events::event_types;
use serde_json::json;

#[tokio::test]
async fn activate_take_and_read_back() {
    let app = build_test_app();
    let playlist = ingest_show(&app).await;

    let response = post_json(&app, &format!("/api/v1/playlists/{playlist}/activate"), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["activation_id"].is_string());

    let response = post_json(&app, &format!("/api/v1/playlists/{playlist}/take"), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let take = body_json(response).await;
    let current = take["data"]["current_part_instance_id"].clone();
    assert!(current.is_string());

    let view = body_json(get(&app, &format!("/api/v1/playlists/{playlist}")).await).await;
    assert_eq!(view["data"]["current"]["id"], current);
    assert_eq!(view["data"]["current"]["part"]["external_id"], "a");
    assert_eq!(view["data"]["next"]["part"]["external_id"], "b");
    assert!(view["data"]["current"]["pieces"].as_array().is_some_and(|p| !p.is_empty()));
}

#[tokio::test]
async fn timeline_is_published_after_activation() {
    let app = build_test_app();
    let playlist = ingest_show(&app).await;

    let before = body_json(get(&app, "/api/v1/studios/studio-1/timeline").await).await;
    assert!(before["data"].is_null());

    let mut events = app.bus.subscribe();
    post_json(&app, &format!("/api/v1/playlists/{playlist}/activate"), json!({})).await;

    let timeline = body_json(get(&app, "/api/v1/studios/studio-1/timeline").await).await;
    assert_eq!(timeline["data"]["playlist_id"], playlist.as_str());
    assert!(timeline["data"]["timeline_hash"].is_string());

    let mut saw_timeline = false;
    while let Ok(event) = events.try_recv() {
        saw_timeline |= event.event_type == event_types::TIMELINE_UPDATED;
    }
    assert!(saw_timeline);
}

#[tokio::test]
async fn take_on_inactive_playlist_is_412() {
    let app = build_test_app();
    let playlist = ingest_show(&app).await;

    let response = post_json(&app, &format!("/api/v1/playlists/{playlist}/take"), json!({})).await;
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INACTIVE_RUNDOWN");
}

#[tokio::test]
async fn rapid_second_take_is_429() {
    let app = build_test_app();
    let playlist = ingest_show(&app).await;
    post_json(&app, &format!("/api/v1/playlists/{playlist}/activate"), json!({})).await;

    let first = post_json(&app, &format!("/api/v1/playlists/{playlist}/take"), json!({})).await;
    assert_eq!(first.status(), StatusCode::OK);
    let current = body_json(first).await["data"]["current_part_instance_id"].clone();
    let second = post_json(
        &app,
        &format!("/api/v1/playlists/{playlist}/take"),
        json!({"from_part_instance_id": current}),
    )
    .await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(second).await["code"], "TAKE_RATE_LIMIT");
}

#[tokio::test]
async fn set_next_requires_exactly_one_target() {
    let app = build_test_app();
    let playlist = ingest_show(&app).await;
    post_json(&app, &format!("/api/v1/playlists/{playlist}/activate"), json!({})).await;

    let response = post_json(&app, &format!("/api/v1/playlists/{playlist}/next"), json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn move_next_and_read_back() {
    let app = build_test_app();
    let playlist = ingest_show(&app).await;
    post_json(&app, &format!("/api/v1/playlists/{playlist}/activate"), json!({})).await;

    let response = post_json(
        &app,
        &format!("/api/v1/playlists/{playlist}/move-next"),
        json!({"part_delta": 2}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let view = body_json(get(&app, &format!("/api/v1/playlists/{playlist}")).await).await;
    assert_eq!(view["data"]["next"]["part"]["external_id"], "c");
}

#[tokio::test]
async fn unknown_playlist_is_404() {
    let app = build_test_app();
    let response = get(&app, "/api/v1/playlists/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "PLAYLIST_NOT_FOUND");
}

#[tokio::test]
async fn invalid_rundown_is_400() {
    let app = build_test_app();
    let mut rundown = common::show("show");
    rundown["external_id"] = json!("");

    let response = post_json(&app, "/api/v1/studios/studio-1/rundowns", rundown).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn segment_upsert_and_removal() {
    let app = build_test_app();
    ingest_show(&app).await;
    let rundown = onair_core::ids::RundownId::derived(&["studio-1", "show"]);

    let response = send_json(
        &app,
        Method::PUT,
        &format!("/api/v1/rundowns/{rundown}/segments"),
        json!({
            "external_id": "seg-3",
            "name": "Sport",
            "rank": 2.0,
            "parts": [common::part("d", 0.0)]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["segment_id"].is_string());

    let response = delete(&app, &format!("/api/v1/rundowns/{rundown}/segments/seg-3")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete(&app, &format!("/api/v1/rundowns/{rundown}/segments/seg-3")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "SEGMENT_NOT_FOUND");
}

#[tokio::test]
async fn on_air_rundown_removal_is_refused() {
    let app = build_test_app();
    let playlist = ingest_show(&app).await;
    post_json(&app, &format!("/api/v1/playlists/{playlist}/activate"), json!({})).await;
    let rundown = onair_core::ids::RundownId::derived(&["studio-1", "show"]);

    let response = delete(&app, &format!("/api/v1/rundowns/{rundown}")).await;
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(body_json(response).await["code"], "RUNDOWN_REMOVE_WHILE_ON_AIR");

    post_json(&app, &format!("/api/v1/playlists/{playlist}/deactivate"), json!({})).await;
    let response = delete(&app, &format!("/api/v1/rundowns/{rundown}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(&app, &format!("/api/v1/playlists/{playlist}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn playback_report_for_next_takes_it() {
    let app = build_test_app();
    let playlist = ingest_show(&app).await;
    post_json(&app, &format!("/api/v1/playlists/{playlist}/activate"), json!({})).await;
    let view = body_json(get(&app, &format!("/api/v1/playlists/{playlist}")).await).await;
    let next = view["data"]["next"]["id"].clone();

    app.advance_ms(2_000);
    let response = post_json(
        &app,
        "/api/v1/devices/playback-changed",
        json!({
            "playlist_id": playlist,
            "changes": [{
                "type": "PART_PLAYBACK_STARTED",
                "part_instance_id": next,
                "time": "2026-01-01T12:00:02Z"
            }]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let view = body_json(get(&app, &format!("/api/v1/playlists/{playlist}")).await).await;
    assert_eq!(view["data"]["current"]["id"], next);
}

#[tokio::test]
async fn stale_resolve_report_returns_null() {
    let app = build_test_app();
    let playlist = ingest_show(&app).await;
    post_json(&app, &format!("/api/v1/playlists/{playlist}/activate"), json!({})).await;

    let response = post_json(
        &app,
        "/api/v1/devices/resolve-done",
        json!({"studio_id": "studio-1", "timeline_hash": "stale", "resolve_duration_ms": 4}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"].is_null());

    let timeline = body_json(get(&app, "/api/v1/studios/studio-1/timeline").await).await;
    let hash = timeline["data"]["timeline_hash"].as_str().unwrap().to_string();
    app.advance_ms(40);
    let response = post_json(
        &app,
        "/api/v1/devices/resolve-done",
        json!({"studio_id": "studio-1", "timeline_hash": hash, "resolve_duration_ms": 4}),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["round_trip_ms"], 40);
}

#[tokio::test]
async fn trigger_time_is_accepted() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/devices/trigger-time",
        json!({"studio_id": "studio-1", "results": [{"object_id": "obj", "time": "2026-01-01T12:00:00Z"}]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
