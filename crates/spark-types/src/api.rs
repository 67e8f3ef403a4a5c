use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{LikeOutcome, MatchSummary, MessageId, RoomId, UserId};

// -- Likes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LikeRequest {
    pub liker_id: UserId,
    pub liked_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub result: LikeOutcome,
}

#[derive(Debug, Serialize)]
pub struct UnlikeResponse {
    pub result: String,
}

#[derive(Debug, Serialize)]
pub struct LikersResponse {
    pub liked_by: Vec<UserId>,
}

// -- Matches --

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchSummary>,
}

// -- Rooms --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRoomRequest {
    pub user_a_id: UserId,
    pub user_b_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    pub room_id: RoomId,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub sender_id: UserId,
    pub body: String,
}

/// Acknowledgement returned once the ciphertext write is confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAck {
    pub message_id: MessageId,
    pub sent_at: DateTime<Utc>,
}
