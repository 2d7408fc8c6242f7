use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::ServiceFailure;
use crate::error::ApiError;
use crate::models::{Presence, PresenceSession};
use crate::store::{Store, StoreError};

const SESSION_ID_MAX: usize = 128;

#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("sessionId must be 1 to 128 characters")]
    InvalidSession,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceFailure for PresenceError {
    fn client_error(&self) -> Option<ApiError> {
        match self {
            PresenceError::InvalidSession => Some(ApiError::field_error("sessionId", self.to_string())),
            PresenceError::Store(e) => e.client_error(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    pub session_id: String,
}

fn check_session_id(session_id: &str) -> Result<&str, PresenceError> {
    let id = session_id.trim();
    if id.is_empty() || id.len() > SESSION_ID_MAX {
        return Err(PresenceError::InvalidSession);
    }
    Ok(id)
}

/// Adds or refreshes a session and drops the ones idle past `timeout`.
pub async fn heartbeat(
    store: &dyn Store,
    uid: &str,
    session_id: &str,
    now: DateTime<Utc>,
    timeout: Duration,
) -> Result<Presence, PresenceError> {
    let session_id = check_session_id(session_id)?;
    let mut presence = store
        .get_presence(uid)
        .await?
        .unwrap_or_else(|| Presence::offline(uid, now));

    match presence.sessions.iter_mut().find(|s| s.session_id == session_id) {
        Some(session) => session.last_activity = now,
        None => presence.sessions.push(PresenceSession {
            session_id: session_id.to_string(),
            started_at: now,
            last_activity: now,
        }),
    }
    presence.prune(now, timeout);
    store.put_presence(&presence).await?;

    debug!("Heartbeat {} / {} ({} sessions)", uid, session_id, presence.sessions.len());
    Ok(presence)
}

pub async fn end_session(
    store: &dyn Store,
    uid: &str,
    session_id: &str,
    now: DateTime<Utc>,
    timeout: Duration,
) -> Result<Presence, PresenceError> {
    let session_id = check_session_id(session_id)?;
    let mut presence = store
        .get_presence(uid)
        .await?
        .unwrap_or_else(|| Presence::offline(uid, now));

    presence.sessions.retain(|s| s.session_id != session_id);
    presence.prune(now, timeout);
    store.put_presence(&presence).await?;

    debug!("Ended session {} / {}", uid, session_id);
    Ok(presence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_heartbeat_and_end() {
        let store = MemoryStore::new();
        let timeout = Duration::minutes(5);
        let now = Utc::now();

        heartbeat(&store, "u1", "tab-a", now, timeout).await.unwrap();
        let p = heartbeat(&store, "u1", "tab-b", now, timeout).await.unwrap();
        assert!(p.online);
        assert_eq!(p.sessions.len(), 2);

        let p = heartbeat(&store, "u1", "tab-a", now + Duration::minutes(1), timeout).await.unwrap();
        assert_eq!(p.sessions.len(), 2);
        assert_eq!(p.sessions[0].started_at, now);

        end_session(&store, "u1", "tab-a", now, timeout).await.unwrap();
        let p = end_session(&store, "u1", "tab-b", now, timeout).await.unwrap();
        assert!(!p.online);
        assert!(p.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_idle_sessions_pruned() {
        let store = MemoryStore::new();
        let timeout = Duration::minutes(5);
        let now = Utc::now();

        heartbeat(&store, "u1", "stale", now, timeout).await.unwrap();
        let p = heartbeat(&store, "u1", "fresh", now + Duration::minutes(6), timeout).await.unwrap();
        assert_eq!(p.sessions.len(), 1);
        assert_eq!(p.sessions[0].session_id, "fresh");
        assert!(p.online);
    }

    #[tokio::test]
    async fn test_blank_session_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            heartbeat(&store, "u1", "  ", Utc::now(), Duration::minutes(5)).await,
            Err(PresenceError::InvalidSession)
        ));
    }
}
