// handlers/elevated/results.rs - race results and rescoring

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use chrono::Utc;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::results::{self, ResultSubmission, ScoringRun};

/// POST /admin/results - record the official top six and score the race
pub async fn result_post(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    body: Result<Json<ResultSubmission>, JsonRejection>,
) -> ApiResult<ScoringRun> {
    let Json(submission) = body?;
    let run = state
        .traced(
            "submit_result",
            results::submit_result(state.store.as_ref(), &admin.id, submission, Utc::now()),
        )
        .await?;
    Ok(ApiResponse::created(run))
}

/// POST /admin/scores/:race_id/recalculate - rescore against the stored result
pub async fn recalculate_post(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(race_id): Path<String>,
) -> ApiResult<ScoringRun> {
    let run = state
        .traced(
            "recalculate_scores",
            results::recalculate(state.store.as_ref(), &admin.id, &race_id, Utc::now()),
        )
        .await?;
    Ok(ApiResponse::success(run))
}
