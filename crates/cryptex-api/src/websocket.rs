//! WebSocket Support
//!
//! `/api/ws` relays every `newOrder` and `cancelOrder` event delivered by the
//! outbox dispatcher as a JSON text frame `{"topic": ..., "payload": ...}`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use cryptex_settlement::Notification;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::state::AppState;

/// Handle WebSocket upgrade for the order event stream
pub async fn ws_events_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // Subscribe before the upgrade completes so no event committed after
    // the handshake is missed
    let events = state.notifier.subscribe();
    ws.on_upgrade(move |socket| handle_event_socket(socket, events))
}

async fn handle_event_socket(socket: WebSocket, mut events: broadcast::Receiver<Notification>) {
    let (mut sender, mut receiver) = socket.split();
    tracing::info!("WebSocket event stream connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(notification) => {
                    let json = match serde_json::to_string(&notification) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::warn!(error = %e, topic = %notification.topic, "Unencodable event");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "WebSocket subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!("WebSocket event stream closed");
}
