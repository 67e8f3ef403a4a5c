use serde::{Deserialize, Serialize};

use crate::models::{RoomId, UserId};

/// Events sent from the server to room subscribers over the WebSocket.
///
/// Tags use the kebab-case wire names (`new-message`). Delivery is
/// best-effort: no replay, no durability — clients catch up via the history
/// endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum GatewayEvent {
    /// A message was persisted to a room. Carries the plaintext body — the
    /// ciphertext envelope only exists at rest.
    NewMessage {
        room_id: RoomId,
        sender_id: UserId,
        body: String,
    },
}

/// Commands sent from a client to the server over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum GatewayCommand {
    /// Subscribe this connection to a room's fan-out group. Idempotent.
    JoinRoom { room_id: RoomId },

    /// Drop this connection's subscription to a room. Disconnecting drops
    /// all subscriptions implicitly.
    LeaveRoom { room_id: RoomId },
}
