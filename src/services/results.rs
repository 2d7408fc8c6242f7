//! Official results, score calculation and standings.
//!
//! Scores are upserted in chunks of [`MAX_BATCH_WRITES`]. A failure part way
//! through leaves earlier chunks written; running the pass again converges
//! because every score is keyed by team and race.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use super::audit;
use super::predictions::normalise_race_id;
use super::ServiceFailure;
use crate::error::ApiError;
use crate::models::{RaceResult, Score, Standing, TeamSlot, User};
use crate::scoring::{calculate_score, TopSix};
use crate::store::{Store, StoreError, MAX_BATCH_WRITES};

#[derive(Debug, Error)]
pub enum ResultError {
    #[error("raceId is required")]
    MissingRaceId,

    #[error("No result submitted for {0}")]
    NoResult(String),

    #[error("League {0} not found")]
    LeagueNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceFailure for ResultError {
    fn client_error(&self) -> Option<ApiError> {
        match self {
            ResultError::MissingRaceId => Some(ApiError::field_error("raceId", self.to_string())),
            ResultError::NoResult(_) | ResultError::LeagueNotFound(_) => {
                Some(ApiError::not_found(self.to_string()))
            }
            ResultError::Store(e) => e.client_error(),
        }
    }
}

/// Body of `POST /admin/results`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSubmission {
    pub race_id: String,
    pub drivers: TopSix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRun {
    pub race_id: String,
    pub scores_written: usize,
    pub batches: usize,
}

/// Stores the official top six and scores every prediction for the race.
pub async fn submit_result(
    store: &dyn Store,
    actor: &str,
    submission: ResultSubmission,
    now: DateTime<Utc>,
) -> Result<ScoringRun, ResultError> {
    let race_id = normalise_race_id(&submission.race_id).ok_or(ResultError::MissingRaceId)?;
    let result = RaceResult {
        race_id: race_id.clone(),
        drivers: submission.drivers,
        submitted_by: actor.to_string(),
        submitted_at: now,
    };
    store.put_race_result(&result).await?;
    info!("Result stored for {}: {}", race_id, result.drivers);

    let run = score_race(store, &result, now).await?;
    audit::record(
        store,
        actor,
        "race_result_submitted",
        json!({
            "raceId": race_id,
            "drivers": result.drivers,
            "scoresWritten": run.scores_written,
        }),
    )
    .await;
    Ok(run)
}

/// Re-scores a race against its stored result.
pub async fn recalculate(
    store: &dyn Store,
    actor: &str,
    race_id: &str,
    now: DateTime<Utc>,
) -> Result<ScoringRun, ResultError> {
    let race_id = normalise_race_id(race_id).ok_or(ResultError::MissingRaceId)?;
    let result = store
        .get_race_result(&race_id)
        .await?
        .ok_or_else(|| ResultError::NoResult(race_id.clone()))?;

    let run = score_race(store, &result, now).await?;
    audit::record(
        store,
        actor,
        "scores_recalculated",
        json!({ "raceId": race_id, "scoresWritten": run.scores_written }),
    )
    .await;
    Ok(run)
}

pub async fn score_race(
    store: &dyn Store,
    result: &RaceResult,
    now: DateTime<Utc>,
) -> Result<ScoringRun, StoreError> {
    let predictions = store.list_predictions_for_race(&result.race_id).await?;
    let scores: Vec<Score> = predictions
        .iter()
        .map(|p| {
            let breakdown = calculate_score(&p.predictions, &result.drivers);
            Score {
                user_id: p.user_id.clone(),
                team_id: p.team_id.clone(),
                team_name: p.team_name.clone(),
                race_id: result.race_id.clone(),
                total_points: breakdown.total_points,
                breakdown: breakdown.summary(),
                calculated_at: now,
            }
        })
        .collect();

    let mut batches = 0;
    for chunk in scores.chunks(MAX_BATCH_WRITES) {
        store.put_scores(chunk).await?;
        batches += 1;
        debug!("Wrote score batch {} ({} scores) for {}", batches, chunk.len(), result.race_id);
    }

    info!("Scored {} predictions for {} in {} batches", scores.len(), result.race_id, batches);
    Ok(ScoringRun {
        race_id: result.race_id.clone(),
        scores_written: scores.len(),
        batches,
    })
}

/// Scores for a race, highest first.
pub async fn race_scores(store: &dyn Store, race_id: &str) -> Result<Vec<Score>, ResultError> {
    let race_id = normalise_race_id(race_id).ok_or(ResultError::MissingRaceId)?;
    let mut scores = store.list_scores_for_race(&race_id).await?;
    scores.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.team_name.to_lowercase().cmp(&b.team_name.to_lowercase()))
    });
    Ok(scores)
}

fn current_team_name(users: &HashMap<&str, &User>, score: &Score) -> String {
    let Some(user) = users.get(score.user_id.as_str()) else {
        return score.team_name.clone();
    };
    if score.team_id == TeamSlot::Secondary.team_id(&user.id) {
        user.secondary_team_name.clone().unwrap_or_else(|| score.team_name.clone())
    } else {
        user.team_name.clone()
    }
}

/// Season totals per team, optionally limited to one league's members.
/// Equal totals share a rank and are ordered by team name.
pub async fn standings(store: &dyn Store, league_id: Option<&str>) -> Result<Vec<Standing>, ResultError> {
    let members = match league_id {
        Some(id) => {
            let league = store
                .get_league(id)
                .await?
                .ok_or_else(|| ResultError::LeagueNotFound(id.to_string()))?;
            (!league.is_global).then_some(league.member_user_ids)
        }
        None => None,
    };

    let users = store.list_users().await?;
    let by_id: HashMap<&str, &User> = users.iter().map(|u| (u.id.as_str(), u)).collect();

    let mut totals: HashMap<String, Standing> = HashMap::new();
    for score in store.list_scores().await? {
        if let Some(members) = &members {
            if !members.contains(&score.user_id) {
                continue;
            }
        }
        let entry = totals.entry(score.team_id.clone()).or_insert_with(|| Standing {
            rank: 0,
            user_id: score.user_id.clone(),
            team_id: score.team_id.clone(),
            team_name: current_team_name(&by_id, &score),
            total_points: 0,
            races_scored: 0,
        });
        entry.total_points += score.total_points;
        entry.races_scored += 1;
    }

    let mut table: Vec<Standing> = totals.into_values().collect();
    table.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.team_name.to_lowercase().cmp(&b.team_name.to_lowercase()))
            .then_with(|| a.team_id.cmp(&b.team_id))
    });

    let mut previous: Option<u32> = None;
    let mut rank = 0;
    for (i, row) in table.iter_mut().enumerate() {
        if previous != Some(row.total_points) {
            rank = i + 1;
            previous = Some(row.total_points);
        }
        row.rank = rank;
    }
    Ok(table)
}
