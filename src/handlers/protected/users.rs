// handlers/protected/users.rs - /api/users/me handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::User;
use crate::services::users::{self, TeamNamesUpdate};

/// GET /api/users/me - the caller's profile
pub async fn me_get(Extension(CurrentUser(user)): Extension<CurrentUser>) -> ApiResult<User> {
    Ok(ApiResponse::success(user))
}

/// PUT /api/users/me - rename the primary and/or secondary team
///
/// An empty `secondaryTeamName` removes the secondary team.
pub async fn me_put(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    body: Result<Json<TeamNamesUpdate>, JsonRejection>,
) -> ApiResult<User> {
    let Json(update) = body?;
    let updated = state
        .traced("update_team_names", users::update_team_names(state.store.as_ref(), &user, update))
        .await?;
    Ok(ApiResponse::success(updated))
}
