use crate::Database;
use crate::models::{MatchRow, MatchSummaryRow, MessageRow, RoomRow};
use anyhow::Result;
use rusqlite::{Connection, ErrorCode};

impl Database {
    // -- Users --

    pub fn upsert_user(&self, user_id: i64, nickname: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_id, nickname) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET nickname = excluded.nickname",
                (user_id, nickname),
            )?;
            Ok(())
        })
    }

    // -- Likes --

    pub fn like_exists(&self, liker_id: i64, liked_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM likes WHERE liker_id = ?1 AND liked_id = ?2",
                    (liker_id, liked_id),
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Insert a directed like. Returns `false` if the (liker, liked) pair
    /// already exists — the primary key is the arbiter under concurrency.
    pub fn insert_like(&self, liker_id: i64, liked_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO likes (liker_id, liked_id) VALUES (?1, ?2)",
                (liker_id, liked_id),
            ) {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Delete a directed like. Returns `false` if no row was affected.
    pub fn delete_like(&self, liker_id: i64, liked_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM likes WHERE liker_id = ?1 AND liked_id = ?2",
                (liker_id, liked_id),
            )?;
            Ok(affected > 0)
        })
    }

    /// Ids of everyone who likes `user_id`, in insertion order.
    pub fn likers_of(&self, user_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT liker_id FROM likes WHERE liked_id = ?1 ORDER BY rowid")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    // -- Matches --

    /// Look up the match for a canonical (user_a < user_b) pair.
    pub fn get_match(&self, user_a_id: i64, user_b_id: i64) -> Result<Option<MatchRow>> {
        self.with_conn(|conn| query_match(conn, user_a_id, user_b_id))
    }

    /// Insert a match for a canonical pair. Returns `false` if the unique
    /// index rejected it — i.e. the pair is already matched. Callers treat
    /// that as the idempotent "already matched" outcome, never an error.
    pub fn insert_match(&self, user_a_id: i64, user_b_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO matches (user_a_id, user_b_id) VALUES (?1, ?2)",
                (user_a_id, user_b_id),
            ) {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn delete_match(&self, user_a_id: i64, user_b_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM matches WHERE user_a_id = ?1 AND user_b_id = ?2",
                (user_a_id, user_b_id),
            )?;
            Ok(())
        })
    }

    /// All matches involving `user_id`, with the other side's nickname
    /// joined in a single query. Store order (match_id ascending).
    pub fn matches_for(&self, user_id: i64) -> Result<Vec<MatchSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.match_id,
                        CASE WHEN m.user_a_id = ?1 THEN m.user_b_id ELSE m.user_a_id END,
                        u.nickname
                 FROM matches m
                 LEFT JOIN users u
                   ON u.user_id = CASE WHEN m.user_a_id = ?1 THEN m.user_b_id ELSE m.user_a_id END
                 WHERE m.user_a_id = ?1 OR m.user_b_id = ?1
                 ORDER BY m.match_id",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(MatchSummaryRow {
                        match_id: row.get(0)?,
                        other_user_id: row.get(1)?,
                        other_nickname: row
                            .get::<_, Option<String>>(2)?
                            .unwrap_or_else(|| "unknown".to_string()),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Rooms --

    /// Insert a room for a canonical pair. Returns the new room id, or
    /// `None` if a room for that pair already exists.
    pub fn insert_room(&self, user_a_id: i64, user_b_id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO chat_rooms (user_a_id, user_b_id) VALUES (?1, ?2)",
                (user_a_id, user_b_id),
            ) {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(e) if is_unique_violation(&e) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_room_by_pair(&self, user_a_id: i64, user_b_id: i64) -> Result<Option<RoomRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT room_id, user_a_id, user_b_id FROM chat_rooms
                     WHERE user_a_id = ?1 AND user_b_id = ?2",
                    (user_a_id, user_b_id),
                    |row| {
                        Ok(RoomRow {
                            room_id: row.get(0)?,
                            user_a_id: row.get(1)?,
                            user_b_id: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_room(&self, room_id: i64) -> Result<Option<RoomRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT room_id, user_a_id, user_b_id FROM chat_rooms WHERE room_id = ?1",
                    [room_id],
                    |row| {
                        Ok(RoomRow {
                            room_id: row.get(0)?,
                            user_a_id: row.get(1)?,
                            user_b_id: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Messages --

    /// Persist a ciphertext envelope. Returns the new message id and the
    /// stored `sent_at` — the database stamps the timestamp, and the ack
    /// must report the same instant a later history fetch will.
    pub fn insert_message(
        &self,
        room_id: i64,
        sender_id: i64,
        envelope: &str,
    ) -> Result<(i64, String)> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                "INSERT INTO chat_messages (room_id, sender_id, ciphertext)
                 VALUES (?1, ?2, ?3)
                 RETURNING message_id, sent_at",
                (room_id, sender_id, envelope),
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(row)
        })
    }

    pub fn get_room_messages(&self, room_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_room_messages(conn, room_id))
    }
}

fn query_match(conn: &Connection, user_a_id: i64, user_b_id: i64) -> Result<Option<MatchRow>> {
    let row = conn
        .query_row(
            "SELECT match_id, user_a_id, user_b_id FROM matches
             WHERE user_a_id = ?1 AND user_b_id = ?2",
            (user_a_id, user_b_id),
            |row| {
                Ok(MatchRow {
                    match_id: row.get(0)?,
                    user_a_id: row.get(1)?,
                    user_b_id: row.get(2)?,
                })
            },
        )
        .optional()?;

    Ok(row)
}

fn query_room_messages(conn: &Connection, room_id: i64) -> Result<Vec<MessageRow>> {
    // JOIN users to fetch the sender nickname in a single query
    let mut stmt = conn.prepare(
        "SELECT m.message_id, m.room_id, m.sender_id, u.nickname, m.ciphertext, m.sent_at
         FROM chat_messages m
         LEFT JOIN users u ON m.sender_id = u.user_id
         WHERE m.room_id = ?1
         ORDER BY m.sent_at ASC, m.message_id ASC",
    )?;

    let rows = stmt
        .query_map([room_id], |row| {
            Ok(MessageRow {
                message_id: row.get(0)?,
                room_id: row.get(1)?,
                sender_id: row.get(2)?,
                sender_nickname: row
                    .get::<_, Option<String>>(3)?
                    .unwrap_or_else(|| "unknown".to_string()),
                ciphertext: row.get(4)?,
                sent_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(e.sqlite_error_code(), Some(ErrorCode::ConstraintViolation))
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
