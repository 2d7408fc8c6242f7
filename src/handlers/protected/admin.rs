// handlers/protected/admin.rs - admin email challenge

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::challenge::{ChallengeIssued, ChallengeService};

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// POST /api/admin/challenge - email a one-time verification link to the admin
pub async fn challenge_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<ChallengeIssued> {
    let service = ChallengeService::new(state.store.as_ref(), state.mailer.as_ref(), &state.config);
    let issued = state
        .traced("admin_challenge", service.request(&user, Utc::now()))
        .await?;
    Ok(ApiResponse::success(issued))
}

/// POST /api/admin/verify - redeem a challenge token
///
/// Success sets the `adminVerified` cookie that unlocks `/admin/*`.
pub async fn verify_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let service = ChallengeService::new(state.store.as_ref(), state.mailer.as_ref(), &state.config);
    let verified = state
        .traced("admin_verify", service.verify(&user, &request.token, Utc::now()))
        .await?;

    let cookie = HeaderValue::from_str(&verified.cookie).map_err(|e| {
        tracing::error!("Unusable admin cookie: {}", e);
        ApiError::internal_server_error("Failed to issue verification cookie")
    })?;
    let mut response = ApiResponse::success(verified).into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}
