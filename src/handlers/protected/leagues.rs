// handlers/protected/leagues.rs - /api/leagues handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use chrono::Utc;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::League;
use crate::services::leagues::{self, CreateLeague};

/// GET /api/leagues - leagues the caller belongs to, global league included
pub async fn leagues_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Vec<League>> {
    let found = state
        .traced("list_leagues", leagues::list_leagues(state.store.as_ref(), &user))
        .await?;
    Ok(ApiResponse::success(found))
}

/// POST /api/leagues - create a private league owned by the caller
pub async fn league_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    body: Result<Json<CreateLeague>, JsonRejection>,
) -> ApiResult<League> {
    let Json(create) = body?;
    let league = state
        .traced(
            "create_league",
            leagues::create_league(state.store.as_ref(), &user, &create.name, Utc::now()),
        )
        .await?;
    Ok(ApiResponse::created(league))
}

/// POST /api/leagues/:id/join
pub async fn league_join(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<League> {
    let league = state
        .traced("join_league", leagues::join_league(state.store.as_ref(), &user, &id))
        .await?;
    Ok(ApiResponse::success(league))
}

/// POST /api/leagues/:id/leave
pub async fn league_leave(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<League> {
    let league = state
        .traced("leave_league", leagues::leave_league(state.store.as_ref(), &user, &id))
        .await?;
    Ok(ApiResponse::success(league))
}
