use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use spark_crypto::MessageCipher;
use spark_db::Database;
use spark_gateway::RoomBroker;
use spark_types::api::MessageAck;
use spark_types::events::GatewayEvent;
use spark_types::models::{CanonicalPair, HistoryMessage, MessageBody, MessageId, RoomId, UserId};

use crate::error::CoreError;

/// Composes the cipher codec, the persistence gateway and the room broker.
///
/// Send path: encrypt, persist the envelope, and only after the confirmed
/// write publish the plaintext to current room subscribers. The write and the
/// publish are not transactional: a storage failure aborts before any
/// publish; a publish with zero subscribers is not a failure at all.
#[derive(Clone)]
pub struct ChatService {
    db: Arc<Database>,
    cipher: Arc<MessageCipher>,
    broker: RoomBroker,
}

impl ChatService {
    pub fn new(db: Arc<Database>, cipher: Arc<MessageCipher>, broker: RoomBroker) -> Self {
        Self { db, cipher, broker }
    }

    /// Create the room for an unordered pair, or return the existing one.
    ///
    /// Rooms are 1:1 with canonical pairs; the unique index enforces it, and
    /// repeated calls are idempotent rather than an error.
    pub async fn create_room(&self, user_x: UserId, user_y: UserId) -> Result<RoomId, CoreError> {
        let pair = CanonicalPair::new(user_x, user_y)
            .ok_or_else(|| CoreError::validation("two distinct user ids are required"))?;

        let db = self.db.clone();
        let room_id = run_blocking(move || {
            if let Some(id) = db.insert_room(pair.a().0, pair.b().0)? {
                return Ok(id);
            }
            // Insert lost to the unique index: the room already exists,
            // either from before this call or from a concurrent creator.
            let existing = db
                .get_room_by_pair(pair.a().0, pair.b().0)?
                .ok_or(CoreError::NotFound)?;
            Ok(existing.room_id)
        })
        .await?;

        Ok(RoomId(room_id))
    }

    /// Encrypt, persist, then fan out the plaintext to room subscribers.
    pub async fn send_message(
        &self,
        room_id: RoomId,
        sender_id: UserId,
        body: &str,
    ) -> Result<MessageAck, CoreError> {
        if body.is_empty() {
            return Err(CoreError::validation("message body is required"));
        }

        // Encryption failure is fatal: never fall back to storing plaintext.
        let envelope = self.cipher.encrypt(body.as_bytes())?;

        let db = self.db.clone();
        let (message_id, sent_at) = run_blocking(move || {
            if db.get_room(room_id.0)?.is_none() {
                return Err(CoreError::NotFound);
            }
            Ok(db.insert_message(room_id.0, sender_id.0, &envelope)?)
        })
        .await?;

        // Write confirmed; fan-out is fire-and-forget from here.
        self.broker
            .publish(
                room_id,
                GatewayEvent::NewMessage {
                    room_id,
                    sender_id,
                    body: body.to_string(),
                },
            )
            .await;

        // The database stamped sent_at; the ack reports the stored instant
        // so it agrees with what fetch_history returns for this message.
        Ok(MessageAck {
            message_id: MessageId(message_id),
            sent_at: parse_sent_at(&sent_at, message_id),
        })
    }

    /// Room history ascending by `sent_at`, each message decrypted
    /// independently: one bad ciphertext yields an `Undecryptable` marker
    /// without aborting the fetch.
    pub async fn fetch_history(&self, room_id: RoomId) -> Result<Vec<HistoryMessage>, CoreError> {
        let db = self.db.clone();
        let rows = run_blocking(move || {
            if db.get_room(room_id.0)?.is_none() {
                return Err(CoreError::NotFound);
            }
            Ok(db.get_room_messages(room_id.0)?)
        })
        .await?;

        let history = rows
            .into_iter()
            .map(|row| {
                let body = match self.cipher.decrypt(&row.ciphertext) {
                    Ok(bytes) => match String::from_utf8(bytes) {
                        Ok(text) => MessageBody::Text(text),
                        Err(_) => {
                            warn!("message {} decrypted to non-UTF-8", row.message_id);
                            MessageBody::Undecryptable
                        }
                    },
                    Err(e) => {
                        warn!("message {} failed to decrypt: {}", row.message_id, e);
                        MessageBody::Undecryptable
                    }
                };

                HistoryMessage {
                    message_id: MessageId(row.message_id),
                    sender_id: UserId(row.sender_id),
                    sender_nickname: row.sender_nickname,
                    body,
                    sent_at: parse_sent_at(&row.sent_at, row.message_id),
                }
            })
            .collect();

        Ok(history)
    }
}

/// Run a closure on the blocking pool; a slow statement must not stall the
/// async workers serving unrelated connections.
async fn run_blocking<T, F>(f: F) -> Result<T, CoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CoreError::Gateway(anyhow::anyhow!("blocking task failed: {e}")))?
}

fn parse_sent_at(raw: &str, message_id: i64) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("corrupt sent_at '{}' on message {}: {}", raw, message_id, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_crypto::keys::generate_key;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn service() -> ChatService {
        let db = Arc::new(Database::open_in_memory().unwrap());
        ChatService::new(
            db,
            Arc::new(MessageCipher::new(generate_key())),
            RoomBroker::new(),
        )
    }

    #[tokio::test]
    async fn create_room_is_idempotent_across_argument_order() {
        let chat = service();
        let first = chat.create_room(UserId(1), UserId(2)).await.unwrap();
        let second = chat.create_room(UserId(2), UserId(1)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn stored_body_is_ciphertext_and_decrypts_back() {
        let chat = service();
        let room = chat.create_room(UserId(1), UserId(2)).await.unwrap();

        chat.send_message(room, UserId(1), "hello").await.unwrap();

        // At rest: an envelope, not the plaintext
        let stored: String = chat
            .db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT ciphertext FROM chat_messages WHERE room_id = ?1",
                    [room.0],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert!(stored.contains(':'));
        assert!(!stored.contains("hello"));

        let history = chat.fetch_history(room).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].body, MessageBody::Text("hello".to_string()));
        assert_eq!(history[0].sender_id, UserId(1));
    }

    #[tokio::test]
    async fn corrupted_row_does_not_abort_history() {
        let chat = service();
        let room = chat.create_room(UserId(1), UserId(2)).await.unwrap();

        chat.send_message(room, UserId(1), "first").await.unwrap();
        let ack = chat.send_message(room, UserId(2), "second").await.unwrap();
        chat.send_message(room, UserId(1), "third").await.unwrap();

        chat.db
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE chat_messages SET ciphertext = 'garbage' WHERE message_id = ?1",
                    [ack.message_id.0],
                )?;
                Ok(())
            })
            .unwrap();

        let history = chat.fetch_history(room).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].body, MessageBody::Text("first".to_string()));
        assert_eq!(history[1].body, MessageBody::Undecryptable);
        assert_eq!(history[2].body, MessageBody::Text("third".to_string()));
    }

    #[tokio::test]
    async fn ack_timestamp_matches_stored_history() {
        let chat = service();
        let room = chat.create_room(UserId(1), UserId(2)).await.unwrap();

        let ack = chat.send_message(room, UserId(1), "hello").await.unwrap();

        let history = chat.fetch_history(room).await.unwrap();
        assert_eq!(history[0].message_id, ack.message_id);
        assert_eq!(history[0].sent_at, ack.sent_at);
    }

    #[tokio::test]
    async fn send_to_missing_room_is_not_found() {
        let chat = service();
        assert!(matches!(
            chat.send_message(RoomId(99), UserId(1), "hi").await,
            Err(CoreError::NotFound)
        ));
        assert!(matches!(
            chat.fetch_history(RoomId(99)).await,
            Err(CoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn empty_body_rejected_before_storage() {
        let chat = service();
        let room = chat.create_room(UserId(1), UserId(2)).await.unwrap();
        assert!(matches!(
            chat.send_message(room, UserId(1), "").await,
            Err(CoreError::Validation(_))
        ));
        assert!(chat.fetch_history(room).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn plaintext_fans_out_to_room_subscribers_only() {
        let chat = service();
        let room = chat.create_room(UserId(1), UserId(2)).await.unwrap();
        let other = chat.create_room(UserId(3), UserId(4)).await.unwrap();

        let (tx_room, mut rx_room) = mpsc::unbounded_channel();
        let (tx_other, mut rx_other) = mpsc::unbounded_channel();
        chat.broker.subscribe(room, Uuid::new_v4(), tx_room).await;
        chat.broker.subscribe(other, Uuid::new_v4(), tx_other).await;

        chat.send_message(room, UserId(1), "hello").await.unwrap();

        assert_eq!(
            rx_room.recv().await.unwrap(),
            GatewayEvent::NewMessage {
                room_id: room,
                sender_id: UserId(1),
                body: "hello".to_string(),
            }
        );
        assert!(rx_other.try_recv().is_err());
    }

    #[tokio::test]
    async fn nothing_published_when_the_write_fails() {
        let chat = service();
        let room = chat.create_room(UserId(1), UserId(2)).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        chat.broker.subscribe(room, Uuid::new_v4(), tx).await;

        // Missing room: the write path errors before any publish
        let _ = chat.send_message(RoomId(404), UserId(1), "lost").await;
        assert!(rx.try_recv().is_err());
    }
}
