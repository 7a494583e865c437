//! Supervisor WebSocket endpoint and session lifecycle.

use crate::AppState;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        ConnectInfo, Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Per-session outbound queue depth. A supervisor console that cannot
/// drain this many frames is treated as gone and disconnected by the
/// registry on the next failed send.
const SESSION_QUEUE_CAPACITY: usize = 64;

/// WebSocket handler: `GET /ws`.
///
/// Supervisor connections carry no credentials; the endpoint sits
/// behind the operator's network boundary.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    tracing::debug!(remote_addr = %addr, "supervisor websocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

/// Handles one supervisor connection for its whole lifetime.
///
/// The socket is split: a forward task drains the session's bounded
/// queue into the sink, while this task feeds every inbound text frame
/// to the broker. Frames from different supervisors are handled on
/// independent tasks and never block each other.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, addr: SocketAddr) {
    let session_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::channel::<String>(SESSION_QUEUE_CAPACITY);
    state.broker.registry().register(session_id, tx).await;
    let supervisor_count = state.broker.registry().len().await;
    tracing::info!(
        session_id = %session_id,
        remote_addr = %addr,
        supervisors = supervisor_count,
        "supervisor connected"
    );

    // Forward frames from the registry queue to the websocket.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(WsMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            WsMessage::Text(text) => {
                state.broker.handle_supervisor_reply(&text.to_string()).await;
            }
            WsMessage::Close(_) => break,
            // Ping/pong are handled by axum; binary frames are not part
            // of the protocol.
            _ => {}
        }
    }

    // A disconnect does not cancel queries this supervisor had not
    // answered; others may still settle them.
    state.broker.registry().unregister(session_id).await;
    send_task.abort();
    tracing::info!(
        session_id = %session_id,
        remote_addr = %addr,
        "supervisor disconnected"
    );
}
