use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use super::audit;
use super::ServiceFailure;
use crate::error::ApiError;
use crate::models::{League, User};
use crate::store::{Store, StoreError};

pub const GLOBAL_LEAGUE_ID: &str = "global";
const NAME_MIN: usize = 3;
const NAME_MAX: usize = 50;

#[derive(Debug, Error)]
pub enum LeagueError {
    #[error("League name must be between 3 and 50 characters")]
    InvalidName,

    #[error("League {0} not found")]
    NotFound(String),

    #[error("Everyone belongs to the global league")]
    GlobalLeague,

    #[error("The league owner cannot leave")]
    OwnerCannotLeave,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceFailure for LeagueError {
    fn client_error(&self) -> Option<ApiError> {
        match self {
            LeagueError::InvalidName => Some(ApiError::field_error("name", self.to_string())),
            LeagueError::NotFound(_) => Some(ApiError::not_found(self.to_string())),
            LeagueError::GlobalLeague | LeagueError::OwnerCannotLeave => {
                Some(ApiError::bad_request(self.to_string()))
            }
            LeagueError::Store(e) => e.client_error(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLeague {
    pub name: String,
}

/// Creates the global league if the store has none.
pub async fn ensure_global_league(store: &dyn Store, now: DateTime<Utc>) -> Result<League, StoreError> {
    if let Some(league) = store.get_league(GLOBAL_LEAGUE_ID).await? {
        return Ok(league);
    }
    let league = League {
        id: GLOBAL_LEAGUE_ID.to_string(),
        name: "Global League".to_string(),
        owner_id: "system".to_string(),
        member_user_ids: Vec::new(),
        is_global: true,
        created_at: now,
    };
    store.put_league(&league).await?;
    info!("Created global league");
    Ok(league)
}

pub async fn create_league(
    store: &dyn Store,
    owner: &User,
    name: &str,
    now: DateTime<Utc>,
) -> Result<League, LeagueError> {
    let name = name.trim();
    if !(NAME_MIN..=NAME_MAX).contains(&name.chars().count()) {
        return Err(LeagueError::InvalidName);
    }

    let league = League {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        owner_id: owner.id.clone(),
        member_user_ids: vec![owner.id.clone()],
        is_global: false,
        created_at: now,
    };
    store.put_league(&league).await?;

    audit::record(store, &owner.id, "league_created", json!({ "leagueId": league.id, "name": league.name })).await;
    info!("{} created league {}", owner.id, league.id);
    Ok(league)
}

async fn load(store: &dyn Store, id: &str) -> Result<League, LeagueError> {
    let league = store
        .get_league(id)
        .await?
        .ok_or_else(|| LeagueError::NotFound(id.to_string()))?;
    if league.is_global {
        return Err(LeagueError::GlobalLeague);
    }
    Ok(league)
}

/// Joining twice is a no-op.
pub async fn join_league(store: &dyn Store, user: &User, id: &str) -> Result<League, LeagueError> {
    let mut league = load(store, id).await?;
    if league.has_member(&user.id) {
        return Ok(league);
    }
    league.member_user_ids.push(user.id.clone());
    store.put_league(&league).await?;

    audit::record(store, &user.id, "league_joined", json!({ "leagueId": league.id })).await;
    info!("{} joined league {}", user.id, league.id);
    Ok(league)
}

pub async fn leave_league(store: &dyn Store, user: &User, id: &str) -> Result<League, LeagueError> {
    let mut league = load(store, id).await?;
    if league.owner_id == user.id {
        return Err(LeagueError::OwnerCannotLeave);
    }
    if !league.has_member(&user.id) {
        return Ok(league);
    }
    league.member_user_ids.retain(|m| *m != user.id);
    store.put_league(&league).await?;

    audit::record(store, &user.id, "league_left", json!({ "leagueId": league.id })).await;
    info!("{} left league {}", user.id, league.id);
    Ok(league)
}

/// Global leagues plus the ones the user belongs to.
pub async fn list_leagues(store: &dyn Store, user: &User) -> Result<Vec<League>, LeagueError> {
    let leagues = store.list_leagues().await?;
    Ok(leagues.into_iter().filter(|l| l.has_member(&user.id)).collect())
}
