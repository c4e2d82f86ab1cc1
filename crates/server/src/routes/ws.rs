// crates/server/src/routes/ws.rs
//! GET /api/ws (and /ws) - progress stream. Every snapshot is pushed as a JSON text frame
//! to every connected client; inbound frames are read and ignored.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::metrics::record_ws_subscribers;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // The bundled UI asks for the `ws` subprotocol; browsers drop the
    // connection unless it is echoed back.
    ws.protocols(["ws"])
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let mut rx = state.broadcaster.subscribe();
    record_ws_subscribers(state.broadcaster.subscriber_count());
    info!("Socket open");

    let forward_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(snapshot) => {
                    let json = match serde_json::to_string(&snapshot) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(error = %e, "Failed to serialize progress snapshot");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Progress subscriber lagging; snapshots dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Drain inbound frames until the client goes away.
    while let Some(Ok(msg)) = stream.next().await {
        if let Message::Close(_) = msg {
            break;
        }
    }

    forward_task.abort();
    // The receiver is dropped with the aborted task; wait for that before counting.
    let _ = forward_task.await;
    record_ws_subscribers(state.broadcaster.subscriber_count());
    info!("Socket closed");
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}
