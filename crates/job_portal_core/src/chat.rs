//! crates/job_portal_core/src/chat.rs
//!
//! Chat between connected users. Every send goes through the connection gate,
//! whatever transport carried it, and is persisted before it is relayed.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::connections::ConnectionGate;
use crate::domain::ChatMessage;
use crate::error::ChatError;
use crate::ports::DatabaseService;

pub const MAX_MESSAGE_CHARS: usize = 2000;

/// The room two users share, independent of argument order.
pub fn room_id(a: Uuid, b: Uuid) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("chat_{}_{}", low, high)
}

pub struct ChatService {
    db: Arc<dyn DatabaseService>,
    gate: Arc<ConnectionGate>,
}

impl ChatService {
    pub fn new(db: Arc<dyn DatabaseService>, gate: Arc<ConnectionGate>) -> Self {
        Self { db, gate }
    }

    async fn authorize(&self, a: Uuid, b: Uuid) -> Result<(), ChatError> {
        if self.gate.is_connected(a, b).await? {
            Ok(())
        } else {
            // Not logged as an anomaly; this may be a deliberate probe.
            debug!("Chat between {} and {} refused: not connected", a, b);
            Err(ChatError::UnauthorizedChat)
        }
    }

    /// Validates, authorizes and stores a message, returning what was stored.
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
    ) -> Result<ChatMessage, ChatError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let length = content.chars().count();
        if length > MAX_MESSAGE_CHARS {
            return Err(ChatError::MessageTooLong(length));
        }

        self.authorize(sender_id, receiver_id).await?;

        let message = ChatMessage {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            room: room_id(sender_id, receiver_id),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.db.save_chat_message(&message).await?;
        Ok(message)
    }

    /// The history between two connected users, oldest first.
    pub async fn conversation(
        &self,
        user_id: Uuid,
        other_id: Uuid,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        self.authorize(user_id, other_id).await?;
        Ok(self
            .db
            .list_chat_messages(&room_id(user_id, other_id))
            .await?)
    }

    pub async fn can_chat(&self, a: Uuid, b: Uuid) -> Result<bool, ChatError> {
        Ok(self.gate.is_connected(a, b).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_ignores_argument_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(room_id(a, b), room_id(b, a));
        assert!(room_id(a, b).starts_with("chat_"));
        assert_ne!(room_id(a, b), room_id(a, Uuid::new_v4()));
    }
}
