//! Chat history REST endpoint

use axum::{
    extract::{Path, Request, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use courier_database::StoredMessage;

use crate::error::{GatewayError, GatewayResult};
use crate::middleware::extract_identity;
use crate::state::GatewayState;

/// One stored message as it appears in history responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub created_at: String,
}

impl From<StoredMessage> for MessageResponse {
    fn from(message: StoredMessage) -> Self {
        Self {
            id: message.public_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            kind: message.kind.to_string(),
            text: message.text,
            file_url: message.file_url,
            file_name: message.file_name,
            created_at: message.created_at,
        }
    }
}

/// Create history routes
pub fn create_history_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/api/chat/history/:friend_id", get(chat_history))
}

#[utoipa::path(
    get,
    path = "/api/chat/history/{friend_id}",
    tag = "Chat",
    params(
        ("friend_id" = String, Path, description = "Counterpart participant id")
    ),
    responses(
        (status = 200, description = "Messages between the two participants, oldest first", body = Vec<MessageResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Message store unavailable")
    )
)]
pub async fn chat_history(
    Path(friend_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    request: Request,
) -> GatewayResult<Json<Vec<MessageResponse>>> {
    let identity = extract_identity(&request)?;

    let messages = state
        .store()
        .history(&identity, &friend_id)
        .await
        .map_err(GatewayError::from)?;

    Ok(Json(messages.into_iter().map(Into::into).collect()))
}
