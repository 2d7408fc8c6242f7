// handlers/public/pub_chat.rs - GET /api/pub-chat handler

use axum::extract::State;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::paddock::{self, PubChat};

/// GET /api/pub-chat - the current Paddock Pub Chat, if one has been published
pub async fn pub_chat_get(State(state): State<AppState>) -> ApiResult<Option<PubChat>> {
    let chat = state
        .traced("pub_chat_get", paddock::current(state.store.as_ref()))
        .await?;
    Ok(ApiResponse::success(chat))
}
