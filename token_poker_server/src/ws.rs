use crate::store::{ListOutcome, RoomStore};
use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, stream::StreamExt};
use std::sync::Arc;
use token_poker_core::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

type SharedStore = Arc<RoomStore>;

pub fn router(store: SharedStore) -> Router {
    Router::new().route("/ws", get(websocket_handler)).with_state(store)
}

async fn websocket_handler(ws: WebSocketUpgrade, State(store): State<SharedStore>) -> impl IntoResponse {
    ws.on_upgrade(|socket| {
        let conn = Uuid::new_v4();
        handle_socket(socket, store).instrument(info_span!("conn", %conn))
    })
}

/// Lifetime of one WebSocket connection.
async fn handle_socket(socket: WebSocket, store: SharedStore) {
    info!("client connected");
    let (mut sender, mut receiver) = socket.split();

    // every reply goes through this channel so long-polls can answer from
    // their own tasks
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    tokio::spawn(
        async move {
            while let Some(msg) = rx.recv().await {
                let payload = match serde_json::to_string(&msg) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("failed to encode reply: {}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
        }
        .in_current_span(),
    );

    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    debug!(room = client_msg.room(), "request");
                    handle_client_message(client_msg, &store, &tx).await
                }
                Err(e) => {
                    warn!("failed to parse message: {}", e);
                    let _ = tx.send(ServerMessage::Error { message: format!("malformed message: {e}") }).await;
                }
            }
        }
    }
    info!("client disconnected");
}

async fn handle_client_message(msg: ClientMessage, store: &SharedStore, tx: &mpsc::Sender<ServerMessage>) {
    match msg {
        ClientMessage::List { room, known_version } => {
            let store = store.clone();
            let tx = tx.clone();
            tokio::spawn(
                async move {
                    let reply = match store.list(&room, known_version).await {
                        ListOutcome::Changed(v) => ServerMessage::Snapshot { room, version: v.version, data: v.state },
                        ListOutcome::Timeout => ServerMessage::Timeout { room },
                    };
                    let _ = tx.send(reply).await;
                }
                .in_current_span(),
            );
        }
        ClientMessage::Commit { room, base_version, state } => {
            let reply = match store.commit(&room, base_version, state) {
                Ok(success) => ServerMessage::CommitResult { room, success },
                Err(e) => {
                    warn!(%room, base_version, "refused commit: {}", e);
                    ServerMessage::Error { message: e.to_string() }
                }
            };
            debug!(?reply, "commit answered");
            let _ = tx.send(reply).await;
        }
    }
}
