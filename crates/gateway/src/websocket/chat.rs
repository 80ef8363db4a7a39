//! Chat WebSocket handler: handshake, read loop, outbound writer, cleanup.
//!
//! The credential is verified before the upgrade; a stream that cannot
//! authenticate is refused without touching the registry. Once upgraded, the
//! session lives until the transport errors, the client closes, an inbound
//! event fails to decode, or a newer connection for the same participant
//! supersedes this one.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use courier_chat::ClientEvent;

use crate::error::GatewayError;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    token: Option<String>,
}

/// Chat WebSocket connection handler
pub async fn chat_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<WebSocketQuery>,
) -> Result<Response, GatewayError> {
    let token = query.token.ok_or_else(|| {
        GatewayError::AuthenticationFailed("Missing token".to_string())
    })?;

    let identity = state
        .verifier
        .verify(&token)
        .map_err(|e| GatewayError::AuthenticationFailed(format!("Invalid token: {}", e)))?;

    Ok(ws.on_upgrade(move |socket| handle_chat_socket(socket, state, identity)))
}

/// Drive one authenticated chat connection to completion.
async fn handle_chat_socket(socket: WebSocket, state: Arc<GatewayState>, identity: String) {
    let (mut sink, mut stream) = socket.split();

    let (session, mut outbound) = state.hub.connect(&identity).await;
    info!(user = %identity, conn = %session.conn_id(), "chat connection established");

    // Writer: drain the outbound channel into the socket. The channel closes
    // when the registry entry is dropped (deregistration or supersession by a
    // newer connection), which ends this task and shuts the transport.
    let mut writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(error) => {
                    warn!(%error, "failed to encode outbound event");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    // Reader: decode inbound events and hand them to the session. A decode
    // failure is fatal for the stream; the client is expected to reconnect.
    let read_loop = async {
        while let Some(message) = stream.next().await {
            let message = match message {
                Ok(message) => message,
                Err(error) => {
                    debug!(user = %identity, %error, "websocket read error");
                    break;
                }
            };

            match message {
                Message::Text(text) => match ClientEvent::decode(&text) {
                    Ok(event) => session.handle_event(event).await,
                    Err(error) => {
                        warn!(user = %identity, %error, "rejecting malformed chat event, closing connection");
                        break;
                    }
                },
                Message::Close(_) => break,
                // Ping/pong are handled by the transport layer.
                _ => {}
            }
        }
    };

    tokio::select! {
        _ = read_loop => {}
        _ = &mut writer => {
            debug!(user = %identity, "outbound channel closed, terminating session");
        }
    }

    session.disconnect().await;
    writer.abort();
    info!(user = %identity, "chat connection closed");
}
