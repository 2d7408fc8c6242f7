use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use super::audit;
use super::ServiceFailure;
use crate::error::ApiError;
use crate::models::User;
use crate::store::{Store, StoreError};

pub const TEAM_NAME_MIN: usize = 3;
pub const TEAM_NAME_MAX: usize = 30;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("{field} must be between 3 and 30 characters")]
    InvalidTeamName { field: &'static str },

    #[error("Team name '{0}' is already taken")]
    TeamNameTaken(String),

    #[error("Primary and secondary team names must differ")]
    SameTeamNames,

    #[error("User {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceFailure for UserError {
    fn client_error(&self) -> Option<ApiError> {
        match self {
            UserError::InvalidTeamName { field } => Some(ApiError::field_error(field, self.to_string())),
            UserError::SameTeamNames => {
                Some(ApiError::field_error("secondaryTeamName", self.to_string()))
            }
            UserError::TeamNameTaken(_) => Some(ApiError::conflict(self.to_string())),
            UserError::NotFound(_) => Some(ApiError::not_found(self.to_string())),
            UserError::Store(e) => e.client_error(),
        }
    }
}

/// Request body for `PUT /api/users/me`. An empty secondary name removes the
/// secondary team.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamNamesUpdate {
    pub team_name: Option<String>,
    pub secondary_team_name: Option<String>,
}

pub fn normalise_team_name(raw: &str, field: &'static str) -> Result<String, UserError> {
    let name = raw.trim().to_string();
    let len = name.chars().count();
    if !(TEAM_NAME_MIN..=TEAM_NAME_MAX).contains(&len) {
        return Err(UserError::InvalidTeamName { field });
    }
    Ok(name)
}

/// Case-insensitive check against every other user's primary and secondary names.
async fn ensure_unique(store: &dyn Store, owner: &str, names: &[&str]) -> Result<(), UserError> {
    let wanted: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
    for user in store.list_users().await? {
        if user.id == owner {
            continue;
        }
        for taken in user.team_names() {
            if let Some(i) = wanted.iter().position(|w| *w == taken.to_lowercase()) {
                return Err(UserError::TeamNameTaken(names[i].to_string()));
            }
        }
    }
    Ok(())
}

fn default_team_name(uid: &str, email: &str) -> String {
    let local: String = email
        .split('@')
        .next()
        .unwrap_or_default()
        .trim()
        .chars()
        .take(TEAM_NAME_MAX)
        .collect();
    if local.chars().count() >= TEAM_NAME_MIN {
        local
    } else {
        format!("Team {}", uid.chars().take(8).collect::<String>())
    }
}

/// First default name nobody else holds: the email stem, then the stem with
/// a uid suffix, then the suffixed stem with a counter.
async fn free_default_team_name(store: &dyn Store, uid: &str, email: &str) -> Result<String, UserError> {
    let base = default_team_name(uid, email);
    let suffix: String = uid.chars().take(4).collect();
    let mut candidate = base.clone();
    for n in 1u32.. {
        match ensure_unique(store, uid, &[&candidate]).await {
            Ok(()) => return Ok(candidate),
            Err(UserError::TeamNameTaken(_)) => {}
            Err(e) => return Err(e),
        }
        let tail = if n == 1 { format!(" {}", suffix) } else { format!(" {}{}", suffix, n) };
        let stem: String = base.chars().take(TEAM_NAME_MAX - tail.chars().count()).collect();
        candidate = format!("{}{}", stem.trim_end(), tail);
    }
    Err(UserError::TeamNameTaken(base))
}

/// Loads the caller, creating the document on first sight.
pub async fn ensure_user(
    store: &dyn Store,
    uid: &str,
    email: &str,
    make_admin: bool,
    now: DateTime<Utc>,
) -> Result<User, UserError> {
    if let Some(user) = store.get_user(uid).await? {
        return Ok(user);
    }

    let mut user = User::new(uid, email, now);
    user.is_admin = make_admin;
    user.team_name = free_default_team_name(store, uid, email).await?;
    store.put_user(&user).await?;

    audit::record(store, uid, "user_created", json!({ "teamName": user.team_name })).await;
    info!("Created user {} ({})", uid, user.team_name);
    Ok(user)
}

pub async fn profile(store: &dyn Store, uid: &str) -> Result<User, UserError> {
    debug!("Loading profile for {}", uid);
    store
        .get_user(uid)
        .await?
        .ok_or_else(|| UserError::NotFound(uid.to_string()))
}

pub async fn update_team_names(
    store: &dyn Store,
    user: &User,
    update: TeamNamesUpdate,
) -> Result<User, UserError> {
    let mut updated = user.clone();

    if let Some(raw) = update.team_name.as_deref() {
        updated.team_name = normalise_team_name(raw, "teamName")?;
    }
    if let Some(raw) = update.secondary_team_name.as_deref() {
        updated.secondary_team_name = if raw.trim().is_empty() {
            None
        } else {
            Some(normalise_team_name(raw, "secondaryTeamName")?)
        };
    }

    if let Some(secondary) = updated.secondary_team_name.as_deref() {
        if secondary.eq_ignore_ascii_case(&updated.team_name) {
            return Err(UserError::SameTeamNames);
        }
    }

    let names: Vec<&str> = updated.team_names().collect();
    ensure_unique(store, &user.id, &names).await?;
    store.put_user(&updated).await?;

    audit::record(
        store,
        &user.id,
        "team_names_updated",
        json!({
            "teamName": updated.team_name,
            "secondaryTeamName": updated.secondary_team_name,
        }),
    )
    .await;
    info!("Updated team names for {}", user.id);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn seeded() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let mut other = User::new("u2", "rival@example.com", Utc::now());
        other.team_name = "Grid Walkers".to_string();
        other.secondary_team_name = Some("Pit Stop Crew".to_string());
        store.put_user(&other).await.unwrap();
        let me = ensure_user(&store, "u1", "me@example.com", false, Utc::now()).await.unwrap();
        (store, me)
    }

    #[tokio::test]
    async fn test_ensure_user_creates_once() {
        let store = MemoryStore::new();
        let first = ensure_user(&store, "u1", "driver@example.com", true, Utc::now()).await.unwrap();
        assert_eq!(first.team_name, "driver");
        assert!(first.is_admin);

        let again = ensure_user(&store, "u1", "driver@example.com", false, Utc::now()).await.unwrap();
        assert_eq!(again, first);
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_user_avoids_taken_default() {
        let store = MemoryStore::new();
        ensure_user(&store, "aaaa1111", "max@one.com", false, Utc::now()).await.unwrap();
        let second = ensure_user(&store, "bbbb2222", "max@two.com", false, Utc::now()).await.unwrap();
        assert_eq!(second.team_name, "max bbbb");
    }

    #[tokio::test]
    async fn test_ensure_user_suffixed_default_stays_unique() {
        let store = MemoryStore::new();
        let mut squatter = User::new("zz", "squatter@example.com", Utc::now());
        squatter.team_name = "Max bbbb".to_string();
        store.put_user(&squatter).await.unwrap();

        ensure_user(&store, "aaaa1111", "max@one.com", false, Utc::now()).await.unwrap();
        let second = ensure_user(&store, "bbbb2222", "max@two.com", false, Utc::now()).await.unwrap();
        assert_eq!(second.team_name, "max bbbb2");
    }

    #[tokio::test]
    async fn test_team_name_length() {
        let (store, me) = seeded().await;
        let update = TeamNamesUpdate {
            team_name: Some("  ab ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_team_names(&store, &me, update).await,
            Err(UserError::InvalidTeamName { field: "teamName" })
        ));

        let update = TeamNamesUpdate {
            team_name: Some("x".repeat(31)),
            ..Default::default()
        };
        assert!(update_team_names(&store, &me, update).await.is_err());
    }

    #[tokio::test]
    async fn test_team_name_unique_across_primary_and_secondary() {
        let (store, me) = seeded().await;
        for taken in ["grid walkers", "PIT STOP CREW"] {
            let update = TeamNamesUpdate {
                team_name: Some(taken.to_string()),
                ..Default::default()
            };
            let err = update_team_names(&store, &me, update).await.unwrap_err();
            assert!(matches!(err, UserError::TeamNameTaken(_)));
            assert_eq!(err.client_error().unwrap().status_code(), 409);
        }

        let update = TeamNamesUpdate {
            secondary_team_name: Some("Grid Walkers".to_string()),
            ..Default::default()
        };
        assert!(update_team_names(&store, &me, update).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_clear_secondary() {
        let (store, me) = seeded().await;
        let update = TeamNamesUpdate {
            team_name: Some(" Box Box ".to_string()),
            secondary_team_name: Some("Undercut".to_string()),
        };
        let updated = update_team_names(&store, &me, update).await.unwrap();
        assert_eq!(updated.team_name, "Box Box");
        assert_eq!(updated.secondary_team_name.as_deref(), Some("Undercut"));

        // keeping your own name is not a conflict
        let update = TeamNamesUpdate {
            team_name: Some("box box".to_string()),
            secondary_team_name: Some(String::new()),
        };
        let updated = update_team_names(&store, &updated, update).await.unwrap();
        assert_eq!(updated.secondary_team_name, None);
        assert_eq!(profile(&store, "u1").await.unwrap().team_name, "box box");
    }

    #[tokio::test]
    async fn test_primary_and_secondary_must_differ() {
        let (store, me) = seeded().await;
        let update = TeamNamesUpdate {
            team_name: Some("Slipstream".to_string()),
            secondary_team_name: Some("SLIPSTREAM".to_string()),
        };
        assert!(matches!(
            update_team_names(&store, &me, update).await,
            Err(UserError::SameTeamNames)
        ));
    }
}
