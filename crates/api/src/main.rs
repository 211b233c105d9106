use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use onair_core::clock::SystemClock;
use onair_db::{DocumentStore, PgDocumentStore};
use onair_events::{EventBus, GatewayDelivery};
use onair_playout::{DefaultBlueprint, PlayoutEngine, PlayoutSettings};
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onair_api::background::instance_cleanup::{self, CleanupConfig};
use onair_api::config::ServerConfig;
use onair_api::{routes, state, ws};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onair_api=debug,onair_playout=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let settings = PlayoutSettings::from_env();
    let cleanup_config = CleanupConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        gateways = config.gateway_endpoints.len(),
        ?settings,
        "Loaded configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = onair_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    onair_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    onair_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(pool));

    // --- CORS ---
    let cors = build_cors_layer(&config);

    // --- Background task cancellation ---
    let background_cancel = CancellationToken::new();

    // --- WebSocket manager ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_handle = ws::start_heartbeat(
        Arc::clone(&ws_manager),
        Duration::from_secs(config.ws_heartbeat_secs),
        background_cancel.clone(),
    );

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    let feed_handle = tokio::spawn(ws::run_feed(Arc::clone(&ws_manager), event_bus.subscribe()));

    let delivery = GatewayDelivery::new(config.gateway_endpoints.clone())
        .expect("Failed to build gateway HTTP client");
    let delivery_handle = tokio::spawn(delivery.run(event_bus.subscribe()));

    tracing::info!("Event services started (change feed, gateway delivery)");

    // --- Engine ---
    let engine = PlayoutEngine::new(
        Arc::clone(&store),
        Arc::new(SystemClock),
        Arc::clone(&event_bus),
        settings,
        Arc::new(DefaultBlueprint),
    );

    // --- Instance cleanup ---
    // Shares the request path's engine so it queues on the same locks.
    let cleanup_handle = tokio::spawn(instance_cleanup::run(
        engine.clone(),
        cleanup_config,
        background_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        engine,
        store,
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        event_bus: Arc::clone(&event_bus),
    };

    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        // -- Middleware stack (applied bottom-up) --
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
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

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    background_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), cleanup_handle).await;
    let _ = heartbeat_handle.await;
    tracing::info!("Background tasks stopped");

    // The router and its engine are gone; dropping the last sender closes
    // the channel and ends both consumers.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), feed_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), delivery_handle).await;
    tracing::info!("Event services shut down");

    ws_manager.shutdown_all().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Build the CORS layer. Panics at startup on an invalid origin.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
