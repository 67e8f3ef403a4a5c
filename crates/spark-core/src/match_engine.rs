use std::sync::Arc;

use spark_db::Database;
use spark_types::models::{CanonicalPair, LikeOutcome, Match, MatchId, MatchSummary, UserId};

use crate::error::CoreError;

/// Owns the like/unlike -> match/unmatch lifecycle.
///
/// Invariant: a match row exists for a canonical pair iff both directed
/// likes between the pair exist. The storage layer offers only
/// single-statement atomicity, so the unique index on the canonical pair is
/// the actual arbiter — a rejected match insert means another caller won the
/// race and is reported as the idempotent "already matched" outcome.
///
/// Methods are synchronous; callers run them via `spawn_blocking`.
#[derive(Clone)]
pub struct MatchEngine {
    db: Arc<Database>,
}

impl MatchEngine {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record a directed like. Returns `Matched` exactly when this like is
    /// the second half of a mutual pair and no match existed yet.
    pub fn like(&self, liker_id: UserId, liked_id: UserId) -> Result<LikeOutcome, CoreError> {
        let pair = CanonicalPair::new(liker_id, liked_id)
            .ok_or_else(|| CoreError::validation("a user cannot like themselves"))?;

        if self.db.like_exists(liker_id.0, liked_id.0)? {
            return Err(CoreError::AlreadyLiked);
        }
        // Lost an insert race between the check and here
        if !self.db.insert_like(liker_id.0, liked_id.0)? {
            return Err(CoreError::AlreadyLiked);
        }

        if !self.db.like_exists(liked_id.0, liker_id.0)? {
            return Ok(LikeOutcome::Liked);
        }

        // Mutual pair. Create the match unless it already exists — either
        // from an earlier episode or from a concurrent mutual like, where
        // the unique index decides who observed the match first.
        if self.db.get_match(pair.a().0, pair.b().0)?.is_some() {
            return Ok(LikeOutcome::Liked);
        }
        if self.db.insert_match(pair.a().0, pair.b().0)? {
            Ok(LikeOutcome::Matched)
        } else {
            Ok(LikeOutcome::Liked)
        }
    }

    /// Remove a directed like. Any match for the pair is deleted
    /// unconditionally: an unlike by either party dissolves the match even
    /// though the other party's like survives. Deliberate asymmetry,
    /// preserved from the product's observed behavior.
    pub fn unlike(&self, liker_id: UserId, liked_id: UserId) -> Result<(), CoreError> {
        let pair = CanonicalPair::new(liker_id, liked_id)
            .ok_or_else(|| CoreError::validation("a user cannot unlike themselves"))?;

        if !self.db.delete_like(liker_id.0, liked_id.0)? {
            return Err(CoreError::NotFound);
        }

        self.db.delete_match(pair.a().0, pair.b().0)?;
        Ok(())
    }

    /// Everyone who likes `user_id`, in insertion order. No pagination.
    pub fn list_likers(&self, user_id: UserId) -> Result<Vec<UserId>, CoreError> {
        let ids = self.db.likers_of(user_id.0)?;
        Ok(ids.into_iter().map(UserId).collect())
    }

    /// All matches involving `user_id`, with the other side's nickname.
    pub fn matches_for(&self, user_id: UserId) -> Result<Vec<MatchSummary>, CoreError> {
        let rows = self.db.matches_for(user_id.0)?;
        Ok(rows
            .into_iter()
            .map(|row| MatchSummary {
                match_id: MatchId(row.match_id),
                other_user_id: UserId(row.other_user_id),
                other_nickname: row.other_nickname,
            })
            .collect())
    }

    /// The match between two users, if any. Argument order is irrelevant.
    pub fn match_between(&self, user_id: UserId, other_id: UserId) -> Result<Match, CoreError> {
        let pair = CanonicalPair::new(user_id, other_id)
            .ok_or_else(|| CoreError::validation("two distinct user ids are required"))?;

        let row = self
            .db
            .get_match(pair.a().0, pair.b().0)?
            .ok_or(CoreError::NotFound)?;

        Ok(Match {
            match_id: MatchId(row.match_id),
            user_a_id: UserId(row.user_a_id),
            user_b_id: UserId(row.user_b_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MatchEngine {
        MatchEngine::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn match_exists_iff_both_likes_exist() {
        let engine = engine();

        assert_eq!(engine.like(UserId(1), UserId(2)).unwrap(), LikeOutcome::Liked);
        assert!(matches!(
            engine.match_between(UserId(1), UserId(2)),
            Err(CoreError::NotFound)
        ));

        assert_eq!(engine.like(UserId(2), UserId(1)).unwrap(), LikeOutcome::Matched);
        let m = engine.match_between(UserId(1), UserId(2)).unwrap();
        assert_eq!((m.user_a_id, m.user_b_id), (UserId(1), UserId(2)));

        // Either party unliking dissolves the match
        engine.unlike(UserId(1), UserId(2)).unwrap();
        assert!(matches!(
            engine.match_between(UserId(1), UserId(2)),
            Err(CoreError::NotFound)
        ));

        // 2 -> 1 was left intact, so re-liking completes the pair again
        assert_eq!(engine.like(UserId(1), UserId(2)).unwrap(), LikeOutcome::Matched);
        assert!(engine.match_between(UserId(7), UserId(1)).is_err());
    }

    #[test]
    fn duplicate_like_is_a_conflict() {
        let engine = engine();

        engine.like(UserId(1), UserId(2)).unwrap();
        assert!(matches!(
            engine.like(UserId(1), UserId(2)),
            Err(CoreError::AlreadyLiked)
        ));
        // Exactly one like row
        assert_eq!(engine.list_likers(UserId(2)).unwrap(), vec![UserId(1)]);
    }

    #[test]
    fn self_like_rejected_before_storage() {
        let engine = engine();
        assert!(matches!(
            engine.like(UserId(4), UserId(4)),
            Err(CoreError::Validation(_))
        ));
        assert!(engine.list_likers(UserId(4)).unwrap().is_empty());
    }

    #[test]
    fn unlike_without_like_is_not_found() {
        let engine = engine();
        assert!(matches!(
            engine.unlike(UserId(1), UserId(2)),
            Err(CoreError::NotFound)
        ));
    }

    #[test]
    fn canonical_lookup_ignores_argument_order() {
        let engine = engine();
        engine.like(UserId(7), UserId(3)).unwrap();
        engine.like(UserId(3), UserId(7)).unwrap();

        let m1 = engine.match_between(UserId(3), UserId(7)).unwrap();
        let m2 = engine.match_between(UserId(7), UserId(3)).unwrap();
        assert_eq!(m1, m2);
        assert_eq!((m1.user_a_id, m1.user_b_id), (UserId(3), UserId(7)));
    }

    #[test]
    fn match_list_joins_nicknames() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.upsert_user(2, "bo").unwrap();
        let engine = MatchEngine::new(db);

        engine.like(UserId(1), UserId(2)).unwrap();
        engine.like(UserId(2), UserId(1)).unwrap();

        let matches = engine.matches_for(UserId(1)).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].other_user_id, UserId(2));
        assert_eq!(matches[0].other_nickname, "bo");

        // From the other side, user 1 has no nickname row
        let matches = engine.matches_for(UserId(2)).unwrap();
        assert_eq!(matches[0].other_nickname, "unknown");
    }

    #[test]
    fn concurrent_mutual_likes_produce_exactly_one_match() {
        for _ in 0..20 {
            let engine = engine();
            let e1 = engine.clone();
            let e2 = engine.clone();

            let t1 = std::thread::spawn(move || e1.like(UserId(1), UserId(2)));
            let t2 = std::thread::spawn(move || e2.like(UserId(2), UserId(1)));

            // Neither caller may see an unhandled error
            t1.join().unwrap().unwrap();
            t2.join().unwrap().unwrap();

            let m = engine.match_between(UserId(1), UserId(2)).unwrap();
            assert_eq!((m.user_a_id, m.user_b_id), (UserId(1), UserId(2)));
            // The unique index guarantees at most one row; both users see
            // exactly one match in their lists.
            assert_eq!(engine.matches_for(UserId(1)).unwrap().len(), 1);
            assert_eq!(engine.matches_for(UserId(2)).unwrap().len(), 1);
        }
    }
}
