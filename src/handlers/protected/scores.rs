// handlers/protected/scores.rs - race scores and season standings

use axum::extract::{rejection::QueryRejection, Path, Query, State};
use serde::Deserialize;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::{Score, Standing};
use crate::services::results;

#[derive(Debug, Deserialize)]
pub struct StandingsQuery {
    pub league: Option<String>,
}

/// GET /api/scores/:race_id - every team's score for one race
pub async fn scores_get(State(state): State<AppState>, Path(race_id): Path<String>) -> ApiResult<Vec<Score>> {
    let scores = state
        .traced("race_scores", results::race_scores(state.store.as_ref(), &race_id))
        .await?;
    Ok(ApiResponse::success(scores))
}

/// GET /api/standings?league=<id> - season standings, all teams or one league
pub async fn standings_get(
    State(state): State<AppState>,
    query: Result<Query<StandingsQuery>, QueryRejection>,
) -> ApiResult<Vec<Standing>> {
    let Query(query) = query?;
    let league = query.league.as_deref().map(str::trim).filter(|l| !l.is_empty());
    let table = state
        .traced("standings", results::standings(state.store.as_ref(), league))
        .await?;
    Ok(ApiResponse::success(table))
}
