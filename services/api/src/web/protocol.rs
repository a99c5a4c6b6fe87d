//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for realtime chat between connected users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribes this socket to the room shared with `peer_id`.
    Join { peer_id: Uuid },

    /// Sends a message. `room` must be the room of the two participants and
    /// `sender_id` must be the authenticated user.
    SendMessage {
        room: String,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the socket is now receiving messages for `room`.
    Joined { room: String },

    /// A message delivered to a room this socket has joined.
    ReceiveMessage {
        sender_id: Uuid,
        sender_name: String,
        content: String,
        timestamp: DateTime<Utc>,
    },

    /// Reports a refused or malformed event. The connection stays open.
    Error { message: String },
}
