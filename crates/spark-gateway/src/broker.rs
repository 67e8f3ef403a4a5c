use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use spark_types::events::GatewayEvent;
use spark_types::models::RoomId;

/// Process-wide registry of ephemeral room subscriptions.
///
/// Maps room id -> the set of currently-connected subscribers. Subscriptions
/// are never persisted: a client that reconnects must re-join its rooms and
/// rely on the history endpoint for anything it missed. Publishing is
/// best-effort — a closed receiver is simply skipped, and a slow subscriber
/// cannot block delivery to others (per-connection unbounded channels).
#[derive(Clone)]
pub struct RoomBroker {
    inner: Arc<BrokerInner>,
}

struct BrokerInner {
    /// room_id -> (conn_id -> sender). The lock serializes registry
    /// mutation (join/disconnect) against publish iteration.
    rooms: RwLock<HashMap<RoomId, HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>>>,
}

impl RoomBroker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                rooms: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Add a connection to a room's fan-out group. Idempotent: re-joining
    /// replaces the stored sender for that connection.
    pub async fn subscribe(
        &self,
        room_id: RoomId,
        conn_id: Uuid,
        tx: mpsc::UnboundedSender<GatewayEvent>,
    ) {
        self.inner
            .rooms
            .write()
            .await
            .entry(room_id)
            .or_default()
            .insert(conn_id, tx);
    }

    /// Remove a connection from one room.
    pub async fn unsubscribe(&self, room_id: RoomId, conn_id: Uuid) {
        let mut rooms = self.inner.rooms.write().await;
        if let Some(subscribers) = rooms.get_mut(&room_id) {
            subscribers.remove(&conn_id);
            if subscribers.is_empty() {
                rooms.remove(&room_id);
            }
        }
    }

    /// Remove a connection from every room — the disconnect path.
    pub async fn unsubscribe_all(&self, conn_id: Uuid) {
        let mut rooms = self.inner.rooms.write().await;
        rooms.retain(|_, subscribers| {
            subscribers.remove(&conn_id);
            !subscribers.is_empty()
        });
    }

    /// Deliver an event to every connection currently subscribed to
    /// `room_id`. No replay: connections that subscribe later never see it.
    pub async fn publish(&self, room_id: RoomId, event: GatewayEvent) {
        let rooms = self.inner.rooms.read().await;
        if let Some(subscribers) = rooms.get(&room_id) {
            for tx in subscribers.values() {
                // Dead receivers are cleaned up on their disconnect path
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Number of live subscriptions for a room (diagnostics/tests).
    pub async fn subscriber_count(&self, room_id: RoomId) -> usize {
        self.inner
            .rooms
            .read()
            .await
            .get(&room_id)
            .map_or(0, |subs| subs.len())
    }
}

impl Default for RoomBroker {
    fn default() -> Self {
        Self::new()
    }
}
