use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending admin magic-link challenge. Only the SHA-256 of the token is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminChallenge {
    pub token_hash: String,
    pub user_id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AdminChallenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Rate-limit ledger row, one per challenge request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeAttempt {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}
