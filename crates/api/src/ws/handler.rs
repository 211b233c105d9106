use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::state::AppState;
use crate::ws::manager::{Subscription, WsManager};

/// GET /api/v1/ws?playlist_id=&studio_id=
///
/// Upgrades to a WebSocket. A text frame holding a subscription object
/// replaces the filter given in the query.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(subscription): Query<Subscription>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager, subscription))
}

async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>, subscription: Subscription) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, ?subscription, "WebSocket connected");

    let mut rx = ws_manager.add(conn_id.clone(), subscription).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => match serde_json::from_str::<Subscription>(text.as_str()) {
                Ok(subscription) => {
                    tracing::debug!(conn_id = %conn_id, ?subscription, "Subscription changed");
                    ws_manager.resubscribe(&conn_id, subscription).await;
                }
                Err(e) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Ignoring malformed subscription");
                }
            },
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
