//! services/api/src/web/ws_handler.rs
//!
//! The realtime chat relay. One socket per browser tab; the socket joins the
//! rooms it shares with its connections and sends messages into them. Every
//! send is re-checked against the connection gate by the chat service.

use crate::web::{
    chat::relay,
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use job_portal_core::{room_id, ChatError};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Everything one socket needs while it is open.
struct ChatSession {
    app_state: Arc<AppState>,
    user_id: Uuid,
    sender_name: String,
    ws_sender: WsSender,
    /// Cancelled when the socket closes; stops every room forwarder.
    shutdown: CancellationToken,
    joined: HashSet<String>,
}

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn send_server_message(ws_sender: &WsSender, msg: &ServerMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {:?}", e);
            return false;
        }
    };
    ws_sender
        .lock()
        .await
        .send(Message::Text(json.into()))
        .await
        .is_ok()
}

fn error_message(message: impl Into<String>) -> ServerMessage {
    ServerMessage::Error {
        message: message.into(),
    }
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    info!("New chat socket for user: {}", user_id);

    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    let sender_name = match app_state.db.get_user(user_id).await {
        Ok(user) => user.username,
        Err(e) => {
            error!("Failed to load user {} for chat: {:?}", user_id, e);
            send_server_message(&ws_sender, &error_message("Failed to load user.")).await;
            return;
        }
    };

    let mut session = ChatSession {
        app_state,
        user_id,
        sender_name,
        ws_sender,
        shutdown: CancellationToken::new(),
        joined: HashSet::new(),
    };

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if let Some(reply) = session.handle_text_message(text.as_str()).await {
                    if !send_server_message(&session.ws_sender, &reply).await {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client sent close message.");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Chat socket error for user {}: {}", user_id, e);
                break;
            }
        }
    }

    session.shutdown.cancel();
    info!("Chat socket closed for user: {}", user_id);
}

impl ChatSession {
    async fn handle_text_message(&mut self, text: &str) -> Option<ServerMessage> {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::Join { peer_id }) => Some(self.join(peer_id).await),
            Ok(ClientMessage::SendMessage {
                room,
                sender_id,
                receiver_id,
                content,
            }) => self.send(room, sender_id, receiver_id, &content).await,
            Err(e) => {
                warn!("Failed to deserialize client message: {}", e);
                Some(error_message(format!("Malformed message: {}", e)))
            }
        }
    }

    async fn join(&mut self, peer_id: Uuid) -> ServerMessage {
        match self.app_state.chat.can_chat(self.user_id, peer_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Join from {} to {} refused: not connected", self.user_id, peer_id);
                return error_message(ChatError::UnauthorizedChat.to_string());
            }
            Err(e) => {
                error!("Failed to check connection for join: {:?}", e);
                return error_message("Could not join the chat.");
            }
        }

        let room = room_id(self.user_id, peer_id);
        if self.joined.insert(room.clone()) {
            self.spawn_forwarder(&room).await;
        }
        ServerMessage::Joined { room }
    }

    /// Pushes everything published to `room` down this socket until it closes.
    async fn spawn_forwarder(&self, room: &str) {
        let hub = self.app_state.chat_hub.clone();
        let mut rx = hub.subscribe(room).await;
        let ws_sender = self.ws_sender.clone();
        let token = self.shutdown.child_token();
        let room = room.to_string();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(msg) => {
                            if !send_server_message(&ws_sender, &msg).await {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Socket lagged behind room {}, skipped {} messages", room, skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            hub.leave(&room, rx).await;
        });
    }

    async fn send(
        &self,
        room: String,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
    ) -> Option<ServerMessage> {
        if sender_id != self.user_id {
            warn!(
                "User {} tried to send a chat message as {}",
                self.user_id, sender_id
            );
            return Some(error_message("sender_id must be the logged-in user"));
        }
        if room != room_id(sender_id, receiver_id) {
            return Some(error_message("room does not match the participants"));
        }

        match self
            .app_state
            .chat
            .send_message(sender_id, receiver_id, content)
            .await
        {
            Ok(message) => {
                relay(&self.app_state, &message, &self.sender_name).await;
                None
            }
            Err(ChatError::Port(e)) => {
                error!("Failed to store chat message: {:?}", e);
                Some(error_message("Message could not be sent."))
            }
            Err(e) => Some(error_message(e.to_string())),
        }
    }
}
