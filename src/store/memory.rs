use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Store, StoreError};
use crate::models::{
    AdminChallenge, AttackAlert, AuditEntry, ChallengeAttempt, EmailLogEntry, ErrorLogEntry,
    League, Prediction, Presence, RaceResult, Score, User,
};

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    // keyed by (team_id, race_id)
    predictions: HashMap<(String, String), Prediction>,
    race_results: HashMap<String, RaceResult>,
    // keyed by (team_id, race_id)
    scores: HashMap<(String, String), Score>,
    challenges: HashMap<String, AdminChallenge>,
    attempts: Vec<ChallengeAttempt>,
    audit_logs: Vec<AuditEntry>,
    error_logs: Vec<ErrorLogEntry>,
    email_logs: Vec<EmailLogEntry>,
    attack_alerts: Vec<AttackAlert>,
    leagues: HashMap<String, League>,
    presence: HashMap<String, Presence>,
    settings: HashMap<String, Value>,
}

/// Process-local store for development runs and tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn email_logs(&self) -> Vec<EmailLogEntry> {
        self.inner.read().await.email_logs.clone()
    }

    pub async fn attack_alerts(&self) -> Vec<AttackAlert> {
        self.inner.read().await.attack_alerts.clone()
    }
}

/// Newest first, capped at `limit`.
fn newest<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    items.iter().rev().take(limit).cloned().collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(uid).cloned())
    }

    async fn put_user(&self, user: &User) -> Result<(), StoreError> {
        self.inner.write().await.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.inner.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn put_prediction(&self, prediction: &Prediction) -> Result<(), StoreError> {
        let key = (prediction.team_id.clone(), prediction.race_id.clone());
        self.inner.write().await.predictions.insert(key, prediction.clone());
        Ok(())
    }

    async fn get_prediction(
        &self,
        team_id: &str,
        race_id: &str,
    ) -> Result<Option<Prediction>, StoreError> {
        let key = (team_id.to_string(), race_id.to_string());
        Ok(self.inner.read().await.predictions.get(&key).cloned())
    }

    async fn list_predictions_for_race(&self, race_id: &str) -> Result<Vec<Prediction>, StoreError> {
        let mut predictions: Vec<Prediction> = self
            .inner
            .read()
            .await
            .predictions
            .values()
            .filter(|p| p.race_id == race_id)
            .cloned()
            .collect();
        predictions.sort_by(|a, b| a.team_id.cmp(&b.team_id));
        Ok(predictions)
    }

    async fn put_race_result(&self, result: &RaceResult) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .race_results
            .insert(result.race_id.clone(), result.clone());
        Ok(())
    }

    async fn get_race_result(&self, race_id: &str) -> Result<Option<RaceResult>, StoreError> {
        Ok(self.inner.read().await.race_results.get(race_id).cloned())
    }

    async fn put_scores(&self, scores: &[Score]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for score in scores {
            inner.scores.insert(score.key(), score.clone());
        }
        Ok(())
    }

    async fn list_scores_for_race(&self, race_id: &str) -> Result<Vec<Score>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .scores
            .values()
            .filter(|s| s.race_id == race_id)
            .cloned()
            .collect())
    }

    async fn list_scores(&self) -> Result<Vec<Score>, StoreError> {
        Ok(self.inner.read().await.scores.values().cloned().collect())
    }

    async fn put_challenge(&self, challenge: &AdminChallenge) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .challenges
            .insert(challenge.token_hash.clone(), challenge.clone());
        Ok(())
    }

    async fn get_challenge(&self, token_hash: &str) -> Result<Option<AdminChallenge>, StoreError> {
        Ok(self.inner.read().await.challenges.get(token_hash).cloned())
    }

    async fn delete_challenge(&self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.challenges.remove(token_hash).is_some())
    }

    async fn put_challenge_attempt(&self, attempt: &ChallengeAttempt) -> Result<(), StoreError> {
        self.inner.write().await.attempts.push(attempt.clone());
        Ok(())
    }

    async fn count_challenge_attempts(
        &self,
        user_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        let count = inner
            .attempts
            .iter()
            .filter(|a| a.created_at >= since)
            .filter(|a| user_id.map_or(true, |uid| a.user_id == uid))
            .count();
        Ok(count as u64)
    }

    async fn prune_challenges(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let attempts = inner.attempts.len();
        inner.attempts.retain(|a| a.created_at >= before);
        let challenges = inner.challenges.len();
        inner.challenges.retain(|_, c| c.expires_at >= before);
        Ok((attempts - inner.attempts.len() + challenges - inner.challenges.len()) as u64)
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.inner.write().await.audit_logs.push(entry.clone());
        Ok(())
    }

    async fn list_audit(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
        Ok(newest(&self.inner.read().await.audit_logs, limit))
    }

    async fn append_error(&self, entry: &ErrorLogEntry) -> Result<(), StoreError> {
        self.inner.write().await.error_logs.push(entry.clone());
        Ok(())
    }

    async fn list_errors(&self, limit: usize) -> Result<Vec<ErrorLogEntry>, StoreError> {
        Ok(newest(&self.inner.read().await.error_logs, limit))
    }

    async fn append_email_log(&self, entry: &EmailLogEntry) -> Result<(), StoreError> {
        self.inner.write().await.email_logs.push(entry.clone());
        Ok(())
    }

    async fn append_attack_alert(&self, alert: &AttackAlert) -> Result<(), StoreError> {
        self.inner.write().await.attack_alerts.push(alert.clone());
        Ok(())
    }

    async fn put_league(&self, league: &League) -> Result<(), StoreError> {
        self.inner.write().await.leagues.insert(league.id.clone(), league.clone());
        Ok(())
    }

    async fn get_league(&self, id: &str) -> Result<Option<League>, StoreError> {
        Ok(self.inner.read().await.leagues.get(id).cloned())
    }

    async fn list_leagues(&self) -> Result<Vec<League>, StoreError> {
        let mut leagues: Vec<League> = self.inner.read().await.leagues.values().cloned().collect();
        leagues.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(leagues)
    }

    async fn get_presence(&self, uid: &str) -> Result<Option<Presence>, StoreError> {
        Ok(self.inner.read().await.presence.get(uid).cloned())
    }

    async fn put_presence(&self, presence: &Presence) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .presence
            .insert(presence.user_id.clone(), presence.clone());
        Ok(())
    }

    async fn put_setting(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.inner.write().await.settings.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.inner.read().await.settings.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn attempt(user_id: &str, at: DateTime<Utc>) -> ChallengeAttempt {
        ChallengeAttempt {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_count_attempts_by_window_and_user() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.put_challenge_attempt(&attempt("a", now - Duration::minutes(90))).await.unwrap();
        store.put_challenge_attempt(&attempt("a", now - Duration::minutes(10))).await.unwrap();
        store.put_challenge_attempt(&attempt("b", now - Duration::minutes(5))).await.unwrap();

        let since = now - Duration::hours(1);
        assert_eq!(store.count_challenge_attempts(Some("a"), since).await.unwrap(), 1);
        assert_eq!(store.count_challenge_attempts(None, since).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_challenge_reports_presence() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let challenge = AdminChallenge {
            token_hash: "abc".to_string(),
            user_id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            created_at: now,
            expires_at: now + Duration::minutes(10),
        };
        store.put_challenge(&challenge).await.unwrap();
        assert!(store.delete_challenge("abc").await.unwrap());
        assert!(!store.delete_challenge("abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_prune_drops_stale_challenge_records() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.put_challenge_attempt(&attempt("a", now - Duration::minutes(90))).await.unwrap();
        store.put_challenge_attempt(&attempt("a", now - Duration::minutes(10))).await.unwrap();
        for (hash, expires) in [("old", now - Duration::minutes(70)), ("live", now + Duration::minutes(5))] {
            store
                .put_challenge(&AdminChallenge {
                    token_hash: hash.to_string(),
                    user_id: "a".to_string(),
                    email: "a@example.com".to_string(),
                    created_at: expires - Duration::minutes(10),
                    expires_at: expires,
                })
                .await
                .unwrap();
        }

        let removed = store.prune_challenges(now - Duration::hours(1)).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.inner.read().await.attempts.len(), 1);
        assert!(store.get_challenge("old").await.unwrap().is_none());
        assert!(store.get_challenge("live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_scores_keyed_by_team_and_race() {
        let store = MemoryStore::new();
        let score = |team: &str, race: &str, points: u32| Score {
            user_id: "u1".to_string(),
            team_id: team.to_string(),
            team_name: "Lando Fan".to_string(),
            race_id: race.to_string(),
            total_points: points,
            breakdown: String::new(),
            calculated_at: Utc::now(),
        };
        store.put_scores(&[score("c", "a_b", 10), score("b_c", "a", 20)]).await.unwrap();
        assert_eq!(store.list_scores().await.unwrap().len(), 2);

        store.put_scores(&[score("c", "a_b", 30)]).await.unwrap();
        let race = store.list_scores_for_race("a_b").await.unwrap();
        assert_eq!(race.len(), 1);
        assert_eq!(race[0].total_points, 30);
    }

    #[tokio::test]
    async fn test_list_audit_newest_first() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store
                .append_audit(&AuditEntry {
                    id: i.to_string(),
                    user_id: "u1".to_string(),
                    action: format!("action_{}", i),
                    details: Value::Null,
                    timestamp: Utc::now(),
                })
                .await
                .unwrap();
        }
        let recent = store.list_audit(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "action_2");
        assert_eq!(recent[1].action, "action_1");
    }
}
