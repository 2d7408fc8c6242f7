//! Document store seam.
//!
//! Collections mirror the league's document layout. Invariants are checked by
//! callers at write time; nothing here spans more than one collection
//! atomically.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{AppConfig, StoreBackend};
use crate::models::{
    AdminChallenge, AttackAlert, AuditEntry, ChallengeAttempt, EmailLogEntry, ErrorLogEntry,
    League, Prediction, Presence, RaceResult, Score, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Bulk writes are chunked into batches of at most this many operations.
pub const MAX_BATCH_WRITES: usize = 500;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt document: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    // users
    async fn get_user(&self, uid: &str) -> Result<Option<User>, StoreError>;
    async fn put_user(&self, user: &User) -> Result<(), StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    // predictions
    async fn put_prediction(&self, prediction: &Prediction) -> Result<(), StoreError>;
    async fn get_prediction(
        &self,
        team_id: &str,
        race_id: &str,
    ) -> Result<Option<Prediction>, StoreError>;
    async fn list_predictions_for_race(&self, race_id: &str) -> Result<Vec<Prediction>, StoreError>;

    // race results
    async fn put_race_result(&self, result: &RaceResult) -> Result<(), StoreError>;
    async fn get_race_result(&self, race_id: &str) -> Result<Option<RaceResult>, StoreError>;

    // scores; one call is one batch of at most MAX_BATCH_WRITES
    async fn put_scores(&self, scores: &[Score]) -> Result<(), StoreError>;
    async fn list_scores_for_race(&self, race_id: &str) -> Result<Vec<Score>, StoreError>;
    async fn list_scores(&self) -> Result<Vec<Score>, StoreError>;

    // admin challenges
    async fn put_challenge(&self, challenge: &AdminChallenge) -> Result<(), StoreError>;
    async fn get_challenge(&self, token_hash: &str) -> Result<Option<AdminChallenge>, StoreError>;
    /// Returns whether a challenge was removed.
    async fn delete_challenge(&self, token_hash: &str) -> Result<bool, StoreError>;
    async fn put_challenge_attempt(&self, attempt: &ChallengeAttempt) -> Result<(), StoreError>;
    /// Attempts created at or after `since`, for one user or everyone.
    async fn count_challenge_attempts(
        &self,
        user_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
    /// Drops attempts created before `before` and challenges that expired
    /// before it. Returns how many records were removed.
    async fn prune_challenges(&self, before: DateTime<Utc>) -> Result<u64, StoreError>;

    // operational logs
    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), StoreError>;
    async fn list_audit(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError>;
    async fn append_error(&self, entry: &ErrorLogEntry) -> Result<(), StoreError>;
    async fn list_errors(&self, limit: usize) -> Result<Vec<ErrorLogEntry>, StoreError>;
    async fn append_email_log(&self, entry: &EmailLogEntry) -> Result<(), StoreError>;
    async fn append_attack_alert(&self, alert: &AttackAlert) -> Result<(), StoreError>;

    // leagues
    async fn put_league(&self, league: &League) -> Result<(), StoreError>;
    async fn get_league(&self, id: &str) -> Result<Option<League>, StoreError>;
    async fn list_leagues(&self) -> Result<Vec<League>, StoreError>;

    // presence
    async fn get_presence(&self, uid: &str) -> Result<Option<Presence>, StoreError>;
    async fn put_presence(&self, presence: &Presence) -> Result<(), StoreError>;

    // app settings
    async fn put_setting(&self, key: &str, value: &Value) -> Result<(), StoreError>;
    async fn get_setting(&self, key: &str) -> Result<Option<Value>, StoreError>;
}

/// Opens the store selected by configuration.
pub async fn open(config: &AppConfig) -> Result<Arc<dyn Store>, StoreError> {
    match config.database.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.database).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
    }
}
