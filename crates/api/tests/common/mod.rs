#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use onair_core::clock::{Clock, ManualClock};
use onair_db::{DocumentStore, MemoryDocumentStore};
use onair_events::EventBus;
use onair_playout::{DefaultBlueprint, PlayoutEngine, PlayoutSettings};
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use onair_api::config::ServerConfig;
use onair_api::routes;
use onair_api::state::AppState;
use onair_api::ws::WsManager;

pub struct TestApp {
    pub router: Router,
    pub engine: PlayoutEngine,
    pub store: Arc<MemoryDocumentStore>,
    pub clock: Arc<ManualClock>,
    pub bus: Arc<EventBus>,
}

impl TestApp {
    pub fn advance_ms(&self, ms: i64) {
        self.clock.advance(chrono::Duration::milliseconds(ms));
    }
}

/// Build the full application router over an in-memory store.
///
/// Mirrors the router construction in `main.rs` so integration tests run
/// through the same middleware stack.
pub fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryDocumentStore::new());
    let clock = Arc::new(ManualClock::new(
        chrono::DateTime::from_timestamp_millis(1_767_268_800_000).unwrap(),
    ));
    let bus = Arc::new(EventBus::new(256));
    let engine = PlayoutEngine::new(
        store.clone(),
        clock.clone() as Arc<dyn Clock>,
        bus.clone(),
        PlayoutSettings::default(),
        Arc::new(DefaultBlueprint),
    );

    let state = AppState {
        engine: engine.clone(),
        store: store.clone() as Arc<dyn DocumentStore>,
        config: Arc::new(ServerConfig::default()),
        ws_manager: Arc::new(WsManager::new()),
        event_bus: bus.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    TestApp {
        router,
        engine,
        store,
        clock,
        bus,
    }
}

pub async fn get(app: &TestApp, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn send_json(app: &TestApp, method: Method, uri: &str, body: Value) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &TestApp, uri: &str, body: Value) -> Response {
    send_json(app, Method::POST, uri, body).await
}

pub async fn delete(app: &TestApp, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn part(external_id: &str, rank: f64) -> Value {
    json!({
        "external_id": external_id,
        "title": external_id,
        "rank": rank,
        "expected_duration": 30_000,
        "pieces": [{
            "external_id": format!("{external_id}-cam"),
            "name": "Camera",
            "source_layer_id": "camera",
            "output_layer_id": "pgm",
            "lifespan": "within_part"
        }]
    })
}

/// A rundown with parts `a`, `b` in segment `seg-1` and `c` in `seg-2`.
pub fn show(external_id: &str) -> Value {
    json!({
        "external_id": external_id,
        "name": "Evening News",
        "playlist_external_id": "evening-show",
        "segments": [
            {"external_id": "seg-1", "name": "Opening", "rank": 0.0, "parts": [part("a", 0.0), part("b", 1.0)]},
            {"external_id": "seg-2", "name": "Weather", "rank": 1.0, "parts": [part("c", 0.0)]}
        ]
    })
}

/// Ingest the standard show and return the playlist id.
pub async fn ingest_show(app: &TestApp) -> String {
    let response = post_json(app, "/api/v1/studios/studio-1/rundowns", show("show")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rundown_id = body_json(response).await["data"]["rundown_id"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(!rundown_id.is_empty());
    onair_core::ids::PlaylistId::derived(&["studio-1", "evening-show"]).to_string()
}
