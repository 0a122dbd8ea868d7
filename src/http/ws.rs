use super::state::AppState;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

/// GET /ws
/// Upgrade to a WebSocket observer: the server pushes JSON-encoded
/// broadcast events; no client messages are part of the protocol beyond
/// connect/disconnect.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let rx = state.events.subscribe();
    ws.on_upgrade(move |socket| observer_loop(socket, rx))
}

async fn observer_loop(
    mut socket: WebSocket,
    mut rx: tokio::sync::broadcast::Receiver<crate::broadcast::BroadcastEvent>,
) {
    info!("observer connected");

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let Ok(payload) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if socket.send(Message::Text(payload)).await.is_err() {
                        // Transport closed; this observer drops out.
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("observer lagged, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                // Client messages are ignored; only the close matters.
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    info!("observer disconnected");
}
