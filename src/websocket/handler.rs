//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use super::hub::ProgressHub;
use super::messages::{ClientMessage, ServerMessage};
use crate::api::AppState;

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            None
        }
    }
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, hub: Arc<ProgressHub>) {
    let (mut sender, mut receiver) = socket.split();

    // Direct replies to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let connection_id = match hub.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected WebSocket connection");
            if let Some(msg) = encode(&ServerMessage::Error {
                message: e.to_string(),
            }) {
                let _ = sender.send(msg).await;
            }
            return;
        }
    };

    // Subscribe before sending the snapshot so no update falls in between
    let mut events = hub.subscribe();

    let greeting = [
        ServerMessage::Connected {
            connection_id: connection_id.clone(),
        },
        ServerMessage::Snapshot {
            snapshot: hub.snapshot(),
        },
    ];
    for message in greeting.iter().filter_map(encode) {
        if sender.send(message).await.is_err() {
            hub.unregister(&connection_id).await;
            return;
        }
    }

    let conn_id_for_send = connection_id.clone();

    // Forward hub events and direct replies to the socket
    let mut send_task = tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                direct = rx.recv() => match direct {
                    Some(msg) => msg,
                    None => break,
                },
                event = events.recv() => match event {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(connection_id = %conn_id_for_send, skipped, "Viewer lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };

            let Some(frame) = encode(&next) else { continue };
            if sender.send(frame).await.is_err() {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let hub_for_recv = Arc::clone(&hub);
    let conn_id_for_recv = connection_id.clone();

    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&hub_for_recv, &conn_id_for_recv, msg).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unregister(&connection_id).await;
}

/// Handle a received WebSocket frame
///
/// Returns false if the connection should be closed.
async fn handle_ws_message(hub: &ProgressHub, connection_id: &str, message: Message) -> bool {
    let reply = match message {
        Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Status) => ServerMessage::Snapshot {
                snapshot: hub.snapshot(),
            },
            Ok(ClientMessage::Ping) => ServerMessage::Pong,
            Err(e) => ServerMessage::Error {
                message: format!("Invalid message format: {}", e),
            },
        },
        Message::Binary(_) => ServerMessage::Error {
            message: "Binary messages not supported".to_string(),
        },
        Message::Ping(_) | Message::Pong(_) => return true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            return false;
        }
    };

    let _ = hub.send_to(connection_id, reply).await;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_request_replies_with_snapshot() {
        let hub = ProgressHub::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        let open = handle_ws_message(&hub, &id, Message::Text(r#"{"type":"status"}"#.into())).await;
        assert!(open);
        assert!(matches!(rx.recv().await, Some(ServerMessage::Snapshot { .. })));
    }

    #[tokio::test]
    async fn test_invalid_and_close_frames() {
        let hub = ProgressHub::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        assert!(handle_ws_message(&hub, &id, Message::Text("nope".into())).await);
        assert!(matches!(rx.recv().await, Some(ServerMessage::Error { .. })));
        assert!(!handle_ws_message(&hub, &id, Message::Close(None)).await);
    }
}
