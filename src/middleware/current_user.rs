use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::app::AppState;
use crate::error::ApiError;
use crate::models::User;
use crate::services::users;

use super::auth::AuthUser;

/// The caller's user document, loaded (or created) after JWT validation
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Middleware that resolves the token subject to a user document
/// New subjects get a user with a default team name
pub async fn current_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let make_admin = state.config.is_bootstrap_admin(&auth_user.email);
    let user = state
        .traced(
            "ensure_user",
            users::ensure_user(state.store.as_ref(), &auth_user.uid, &auth_user.email, make_admin, Utc::now()),
        )
        .await?;

    tracing::debug!("Request by {} ({}), admin: {}", user.id, user.team_name, user.is_admin);

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
