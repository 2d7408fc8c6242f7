// handlers/protected/predictions.rs - /api/predictions handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use chrono::Utc;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::Prediction;
use crate::services::predictions::{self, PredictionSubmission};

/// POST /api/predictions - submit or replace a top-six prediction
///
/// Body: `{ "raceId": "monaco-2025", "team": "primary", "predictions": [...] }`.
/// Rejected with 409 once the race result is in.
pub async fn prediction_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    body: Result<Json<PredictionSubmission>, JsonRejection>,
) -> ApiResult<Prediction> {
    let Json(submission) = body?;
    let prediction = state
        .traced(
            "submit_prediction",
            predictions::submit_prediction(state.store.as_ref(), &user, submission, Utc::now()),
        )
        .await?;
    Ok(ApiResponse::created(prediction))
}

/// GET /api/predictions/:race_id - the caller's predictions for a race
pub async fn predictions_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(race_id): Path<String>,
) -> ApiResult<Vec<Prediction>> {
    let found = state
        .traced(
            "list_predictions",
            predictions::list_predictions(state.store.as_ref(), &user, &race_id),
        )
        .await?;
    Ok(ApiResponse::success(found))
}
