use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSession {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub user_id: String,
    pub online: bool,
    pub sessions: Vec<PresenceSession>,
    pub updated_at: DateTime<Utc>,
}

impl Presence {
    pub fn offline(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            online: false,
            sessions: Vec::new(),
            updated_at: now,
        }
    }

    /// Drops sessions idle for longer than `timeout` and recomputes `online`.
    pub fn prune(&mut self, now: DateTime<Utc>, timeout: Duration) {
        self.sessions.retain(|s| now - s.last_activity <= timeout);
        self.online = !self.sessions.is_empty();
        self.updated_at = now;
    }
}
