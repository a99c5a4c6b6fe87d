//! services/api/src/web/chat.rs
//!
//! REST endpoints for chat history and for sending a message without a socket.
//! Messages sent here are also relayed to any sockets in the room.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use job_portal_core::ChatMessage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::protocol::ServerMessage;
use crate::web::rest::{ErrorBody, HttpError};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub room: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessage> for MessageResponse {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id,
            sender_id: m.sender_id,
            receiver_id: m.receiver_id,
            room: m.room,
            content: m.content,
            created_at: m.created_at,
        }
    }
}

/// Fans a stored message out to the sockets in its room.
pub(crate) async fn relay(state: &AppState, message: &ChatMessage, sender_name: &str) {
    let delivered = state
        .chat_hub
        .publish(
            &message.room,
            ServerMessage::ReceiveMessage {
                sender_id: message.sender_id,
                sender_name: sender_name.to_string(),
                content: message.content.clone(),
                timestamp: message.created_at,
            },
        )
        .await;
    debug!("Message {} relayed to {} sockets", message.id, delivered);
}

/// The conversation with another user, oldest first. Requires a connection.
#[utoipa::path(
    get,
    path = "/chat/{user_id}/messages",
    params(("user_id" = Uuid, Path, description = "The other participant")),
    responses(
        (status = 200, description = "Conversation history", body = [MessageResponse]),
        (status = 403, description = "Not connected", body = ErrorBody)
    )
)]
pub async fn list_messages_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(other): Path<Uuid>,
) -> Result<Json<Vec<MessageResponse>>, HttpError> {
    let messages = state.chat.conversation(user_id, other).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/chat/{user_id}/messages",
    params(("user_id" = Uuid, Path, description = "The recipient")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = MessageResponse),
        (status = 400, description = "Empty or too long", body = ErrorBody),
        (status = 403, description = "Not connected", body = ErrorBody)
    )
)]
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(other): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, HttpError> {
    // Resolved first so a failed lookup cannot follow a stored message.
    let sender = state.db.get_user(user_id).await?;
    let message = state.chat.send_message(user_id, other, &req.content).await?;
    relay(&state, &message, &sender.username).await;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}
