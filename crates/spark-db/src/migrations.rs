use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Opaque user store: the core only joins nicknames from here.
        CREATE TABLE IF NOT EXISTS users (
            user_id     INTEGER PRIMARY KEY,
            nickname    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Directed like edge, unique per ordered (liker, liked) pair.
        CREATE TABLE IF NOT EXISTS likes (
            liker_id    INTEGER NOT NULL,
            liked_id    INTEGER NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (liker_id, liked_id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_liked
            ON likes(liked_id);

        -- Undirected match, ids stored in canonical (min, max) order.
        -- The unique index is the arbiter for concurrent mutual likes:
        -- a violated insert means the match already exists.
        CREATE TABLE IF NOT EXISTS matches (
            match_id    INTEGER PRIMARY KEY AUTOINCREMENT,
            user_a_id   INTEGER NOT NULL,
            user_b_id   INTEGER NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (user_a_id, user_b_id),
            CHECK (user_a_id < user_b_id)
        );

        -- One persistent room per canonical pair.
        CREATE TABLE IF NOT EXISTS chat_rooms (
            room_id     INTEGER PRIMARY KEY AUTOINCREMENT,
            user_a_id   INTEGER NOT NULL,
            user_b_id   INTEGER NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (user_a_id, user_b_id),
            CHECK (user_a_id < user_b_id)
        );

        -- Immutable messages; ciphertext holds the serialized envelope,
        -- never plaintext.
        CREATE TABLE IF NOT EXISTS chat_messages (
            message_id  INTEGER PRIMARY KEY AUTOINCREMENT,
            room_id     INTEGER NOT NULL REFERENCES chat_rooms(room_id),
            sender_id   INTEGER NOT NULL,
            ciphertext  TEXT NOT NULL,
            sent_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_room
            ON chat_messages(room_id, sent_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
