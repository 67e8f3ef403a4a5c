/// Database row types — these map directly to SQLite rows.
/// Distinct from spark-types API models to keep the DB layer independent.

pub struct MatchRow {
    pub match_id: i64,
    pub user_a_id: i64,
    pub user_b_id: i64,
}

pub struct MatchSummaryRow {
    pub match_id: i64,
    pub other_user_id: i64,
    pub other_nickname: String,
}

pub struct RoomRow {
    pub room_id: i64,
    pub user_a_id: i64,
    pub user_b_id: i64,
}

pub struct MessageRow {
    pub message_id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub sender_nickname: String,
    pub ciphertext: String,
    pub sent_at: String,
}
