use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

id_type!(
    /// Opaque user identifier. The core never inspects user attributes;
    /// only the `Ord` impl is used (for canonical pair ordering).
    UserId
);
id_type!(MatchId);
id_type!(RoomId);
id_type!(MessageId);

/// An unordered pair of distinct user ids, normalized to `(min, max)`.
///
/// Matches and rooms are stored under the canonical ordering so that lookups
/// with either argument order resolve to the same row. Ordering relies only
/// on `Ord` over `UserId`, not on integer arithmetic, so the id
/// representation can change without touching this logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalPair {
    a: UserId,
    b: UserId,
}

impl CanonicalPair {
    /// Returns `None` if the two ids are equal — a user cannot pair with
    /// themselves.
    pub fn new(x: UserId, y: UserId) -> Option<Self> {
        if x == y {
            return None;
        }
        let (a, b) = if x < y { (x, y) } else { (y, x) };
        Some(Self { a, b })
    }

    /// The smaller id of the pair.
    pub fn a(&self) -> UserId {
        self.a
    }

    /// The larger id of the pair.
    pub fn b(&self) -> UserId {
        self.b
    }
}

/// Outcome of a successful like. An already-existing like is an error
/// (`AlreadyLiked`), not an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeOutcome {
    /// Like recorded; the reciprocal like does not exist (or a match for the
    /// pair already did — liking is idempotent with respect to the match).
    Liked,
    /// Like recorded and it completed a mutual pair: a match now exists.
    Matched,
}

/// A stored match between two users, ids in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub match_id: MatchId,
    pub user_a_id: UserId,
    pub user_b_id: UserId,
}

/// One entry of a user's match list, joined with the other side's nickname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_id: MatchId,
    pub other_user_id: UserId,
    pub other_nickname: String,
}

/// Decrypted (or not) body of a stored message. History fetches decrypt each
/// message independently; a row that fails to decrypt is surfaced as
/// `Undecryptable` without aborting the fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum MessageBody {
    Text(String),
    Undecryptable,
}

/// One message of a room's history, ascending by `sent_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub sender_nickname: String,
    pub body: MessageBody,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_orders_either_way() {
        let p1 = CanonicalPair::new(UserId(7), UserId(3)).unwrap();
        let p2 = CanonicalPair::new(UserId(3), UserId(7)).unwrap();
        assert_eq!(p1, p2);
        assert_eq!(p1.a(), UserId(3));
        assert_eq!(p1.b(), UserId(7));
    }

    #[test]
    fn canonical_pair_rejects_self() {
        assert!(CanonicalPair::new(UserId(5), UserId(5)).is_none());
    }
}
