//! Sliding one-hour window over `admin_challenge_attempts`.
//!
//! The count and the write are separate store calls, so two concurrent
//! requests can both pass a limit that only one of them should. That race
//! is accepted.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::models::ChallengeAttempt;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RateDecision {
    Allowed,
    UserLimited { count: u64, limit: u64 },
    GlobalLimited { count: u64, limit: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

pub struct RateLimiter<'a> {
    store: &'a dyn Store,
    per_user_limit: u64,
    global_limit: u64,
    window: Duration,
}

impl<'a> RateLimiter<'a> {
    pub fn new(store: &'a dyn Store, per_user_limit: u64, global_limit: u64) -> Self {
        Self {
            store,
            per_user_limit,
            global_limit,
            window: Duration::hours(1),
        }
    }

    /// The global limit is checked first so a flood is reported as such even
    /// when the caller is also over their own limit.
    pub async fn check(&self, user_id: &str, now: DateTime<Utc>) -> Result<RateDecision, StoreError> {
        let since = now - self.window;

        let global = self.store.count_challenge_attempts(None, since).await?;
        if global >= self.global_limit {
            return Ok(RateDecision::GlobalLimited {
                count: global,
                limit: self.global_limit,
            });
        }

        let mine = self.store.count_challenge_attempts(Some(user_id), since).await?;
        if mine >= self.per_user_limit {
            return Ok(RateDecision::UserLimited {
                count: mine,
                limit: self.per_user_limit,
            });
        }

        Ok(RateDecision::Allowed)
    }

    pub async fn record(&self, user_id: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let attempt = ChallengeAttempt {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: now,
        };
        self.store.put_challenge_attempt(&attempt).await?;

        let pruned = self.store.prune_challenges(now - self.window).await?;
        if pruned > 0 {
            debug!("Pruned {} stale challenge records", pruned);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_per_user_limit() {
        let store = MemoryStore::new();
        let limiter = RateLimiter::new(&store, 2, 10);
        let now = Utc::now();

        assert_eq!(limiter.check("a", now).await.unwrap(), RateDecision::Allowed);
        limiter.record("a", now).await.unwrap();
        limiter.record("a", now).await.unwrap();

        assert_eq!(
            limiter.check("a", now).await.unwrap(),
            RateDecision::UserLimited { count: 2, limit: 2 }
        );
        assert!(limiter.check("b", now).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_global_limit_wins() {
        let store = MemoryStore::new();
        let limiter = RateLimiter::new(&store, 1, 3);
        let now = Utc::now();
        for user in ["a", "b", "c"] {
            limiter.record(user, now).await.unwrap();
        }

        assert_eq!(
            limiter.check("a", now).await.unwrap(),
            RateDecision::GlobalLimited { count: 3, limit: 3 }
        );
        assert!(matches!(
            limiter.check("d", now).await.unwrap(),
            RateDecision::GlobalLimited { .. }
        ));
    }

    #[tokio::test]
    async fn test_record_prunes_outside_window() {
        let store = MemoryStore::new();
        let limiter = RateLimiter::new(&store, 5, 10);
        let now = Utc::now();
        limiter.record("a", now - Duration::hours(3)).await.unwrap();
        limiter.record("a", now - Duration::hours(2)).await.unwrap();
        limiter.record("b", now).await.unwrap();

        let since = now - Duration::days(1);
        assert_eq!(store.count_challenge_attempts(None, since).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_window_slides() {
        let store = MemoryStore::new();
        let limiter = RateLimiter::new(&store, 1, 10);
        let now = Utc::now();
        limiter.record("a", now - Duration::minutes(61)).await.unwrap();

        assert!(limiter.check("a", now).await.unwrap().is_allowed());
        limiter.record("a", now - Duration::minutes(59)).await.unwrap();
        assert!(!limiter.check("a", now).await.unwrap().is_allowed());
    }
}
