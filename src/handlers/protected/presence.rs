// handlers/protected/presence.rs - session heartbeats

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use chrono::Utc;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::Presence;
use crate::services::presence::{self, Heartbeat};

/// POST /api/presence/heartbeat - keep a session alive
pub async fn heartbeat_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    body: Result<Json<Heartbeat>, JsonRejection>,
) -> ApiResult<Presence> {
    let Json(beat) = body?;
    let presence = state
        .traced(
            "presence_heartbeat",
            presence::heartbeat(
                state.store.as_ref(),
                &user.id,
                &beat.session_id,
                Utc::now(),
                state.presence_timeout(),
            ),
        )
        .await?;
    Ok(ApiResponse::success(presence))
}

/// DELETE /api/presence/:session_id - end a session
pub async fn session_delete(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(session_id): Path<String>,
) -> ApiResult<Presence> {
    let presence = state
        .traced(
            "presence_end_session",
            presence::end_session(
                state.store.as_ref(),
                &user.id,
                &session_id,
                Utc::now(),
                state.presence_timeout(),
            ),
        )
        .await?;
    Ok(ApiResponse::success(presence))
}
