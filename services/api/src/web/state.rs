//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the in-process chat hub.

use crate::config::Config;
use crate::web::protocol::ServerMessage;
use job_portal_core::{
    ApplicationWorkflow, ChatService, ConnectionGate, DatabaseService, JobSourceService,
    ProfileService, SyncEngine,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Messages buffered per room before a slow subscriber starts lagging.
const ROOM_CAPACITY: usize = 64;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub sync: Arc<SyncEngine>,
    pub applications: Arc<ApplicationWorkflow>,
    pub gate: Arc<ConnectionGate>,
    pub chat: Arc<ChatService>,
    pub profiles: Arc<ProfileService>,
    pub chat_hub: ChatHub,
}

impl AppState {
    /// Wires the core services over the given store and job source.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseService>,
        source: Arc<dyn JobSourceService>,
    ) -> Self {
        let remote_timeout = config.employer_api.timeout;
        let ttl = chrono::Duration::from_std(config.job_cache_ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(job_portal_core::sync::DEFAULT_SYNC_TTL_SECS));

        let gate = Arc::new(ConnectionGate::new(db.clone()));
        Self {
            sync: Arc::new(SyncEngine::new(
                db.clone(),
                source.clone(),
                ttl,
                remote_timeout,
            )),
            applications: Arc::new(ApplicationWorkflow::new(
                db.clone(),
                source,
                remote_timeout,
            )),
            chat: Arc::new(ChatService::new(db.clone(), gate.clone())),
            profiles: Arc::new(ProfileService::new(db.clone())),
            gate,
            db,
            config,
            chat_hub: ChatHub::default(),
        }
    }
}

//=========================================================================================
// ChatHub (Room Fan-out for Live Sockets)
//=========================================================================================

/// One broadcast channel per chat room. Delivery is best-effort to whoever is
/// subscribed at the time; history lives in the database.
#[derive(Clone, Default)]
pub struct ChatHub {
    rooms: Arc<Mutex<HashMap<String, broadcast::Sender<ServerMessage>>>>,
}

impl ChatHub {
    pub async fn subscribe(&self, room: &str) -> broadcast::Receiver<ServerMessage> {
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Returns how many sockets received the message.
    pub async fn publish(&self, room: &str, message: ServerMessage) -> usize {
        let mut rooms = self.rooms.lock().await;
        let Some(sender) = rooms.get(room) else {
            return 0;
        };
        match sender.send(message) {
            Ok(delivered) => delivered,
            Err(_) => {
                // Every subscriber has gone away.
                rooms.remove(room);
                0
            }
        }
    }

    /// Drops a subscription and forgets the room once nobody listens to it.
    pub async fn leave(&self, room: &str, receiver: broadcast::Receiver<ServerMessage>) {
        let mut rooms = self.rooms.lock().await;
        drop(receiver);
        if rooms.get(room).is_some_and(|sender| sender.receiver_count() == 0) {
            rooms.remove(room);
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ping() -> ServerMessage {
        ServerMessage::Error {
            message: "ping".to_string(),
        }
    }

    #[tokio::test]
    async fn room_is_dropped_when_its_last_socket_leaves() {
        let hub = ChatHub::default();
        let room = Uuid::new_v4().to_string();
        let first = hub.subscribe(&room).await;
        let mut second = hub.subscribe(&room).await;

        hub.leave(&room, first).await;
        assert_eq!(hub.room_count().await, 1);
        assert_eq!(hub.publish(&room, ping()).await, 1);
        assert!(second.recv().await.is_ok());

        hub.leave(&room, second).await;
        assert_eq!(hub.room_count().await, 0);
        assert_eq!(hub.publish(&room, ping()).await, 0);
    }
}
