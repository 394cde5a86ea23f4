//! Session lifecycle: one WebSocket per endpoint identifier.
//!
//! The read loop is the only consumer of inbound frames. Outbound frames from
//! any task funnel through the registry queue and are drained by the writer
//! task, so the socket sink has exactly one writer.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use peerlink_core::ConnectionRegistry;
use peerlink_core::envelope::{self, Inbound};

use crate::state::AppState;

/// WebSocket upgrade handler; the path id becomes the session identifier.
pub async fn session_handler(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session(socket, user_id, state))
}

async fn handle_session(socket: WebSocket, user_id: String, state: AppState) {
    info!(user = %user_id, "session established");

    let (mut sink, mut stream) = socket.split();
    let (conn_id, mut outbound) = state.registry.register(&user_id).await;

    // Sole writer of the sink. Ends when the registry entry is superseded or
    // deregistered, which drops the queue's sender.
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    broadcast_presence(&state.registry, &user_id, true).await;

    // Initial sync runs to completion before the read loop consumes any
    // inbound frame: direct history, then group backlogs, then the presence
    // snapshot of everyone already online.
    if let Err(e) = state.routing.sync_direct(&user_id).await {
        warn!(user = %user_id, error = %e, "direct message sync failed");
    }
    if let Err(e) = state.groups.sync_for_user(&user_id).await {
        warn!(user = %user_id, error = %e, "group sync failed");
    }
    send_online_peers(&state.registry, &user_id).await;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match envelope::decode(text.as_str()) {
                Ok(Inbound::Signaling(signaling)) => state.signaling.relay(&signaling).await,
                Ok(Inbound::Chat(chat)) => {
                    let result = if chat.is_group_addressed() {
                        state.groups.handle_message(*chat).await
                    } else {
                        state.routing.dispatch(*chat).await
                    };
                    if let Err(e) = result {
                        warn!(user = %user_id, error = %e, "failed to route envelope");
                    }
                }
                Ok(Inbound::Ignored) => {}
                Err(e) => warn!(user = %user_id, error = %e, "dropping malformed envelope"),
            },
            Ok(Message::Close(_)) => break,
            // Ping/pong bookkeeping is handled by the websocket layer.
            Ok(_) => {}
            Err(e) => {
                debug!(user = %user_id, error = %e, "read error");
                break;
            }
        }
    }

    // A superseded session no longer owns its registry slot and must not
    // broadcast its successor offline.
    if state.registry.deregister(&user_id, conn_id).await {
        broadcast_presence(&state.registry, &user_id, false).await;
    }
    writer.abort();

    info!(user = %user_id, "session closed");
}

/// Tell every other online session that `user_id` changed presence.
async fn broadcast_presence(registry: &ConnectionRegistry, user_id: &str, online: bool) {
    let envelope = envelope::presence_envelope(user_id, online);
    for (peer, peer_online) in registry.snapshot().await {
        if peer_online && peer != user_id {
            registry.send(&peer, &envelope).await;
        }
    }
}

/// Give a fresh session the presence of everyone already online.
async fn send_online_peers(registry: &ConnectionRegistry, user_id: &str) {
    for (peer, online) in registry.snapshot().await {
        if online && peer != user_id {
            registry
                .send(user_id, &envelope::presence_envelope(&peer, true))
                .await;
        }
    }
}
