// handlers/elevated/pub_chat.rs - PUT /admin/pub-chat handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::Utc;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::paddock::{self, PubChat, PubChatUpdate};

/// PUT /admin/pub-chat - publish a new Paddock Pub Chat body
pub async fn pub_chat_put(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    body: Result<Json<PubChatUpdate>, JsonRejection>,
) -> ApiResult<PubChat> {
    let Json(update) = body?;
    let chat = state
        .traced(
            "publish_pub_chat",
            paddock::publish(state.store.as_ref(), &update.content, &admin.id, Utc::now()),
        )
        .await?;
    Ok(ApiResponse::success(chat))
}
