use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::audit;
use super::ServiceFailure;
use crate::error::ApiError;
use crate::models::{Prediction, TeamSlot, User};
use crate::scoring::TopSix;
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("raceId is required")]
    MissingRaceId,

    #[error("No secondary team registered")]
    NoSecondaryTeam,

    #[error("Predictions for {0} are closed; results have been submitted")]
    RaceClosed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceFailure for PredictionError {
    fn client_error(&self) -> Option<ApiError> {
        match self {
            PredictionError::MissingRaceId => Some(ApiError::field_error("raceId", self.to_string())),
            PredictionError::NoSecondaryTeam => Some(ApiError::field_error("team", self.to_string())),
            PredictionError::RaceClosed(_) => Some(ApiError::conflict(self.to_string())),
            PredictionError::Store(e) => e.client_error(),
        }
    }
}

/// Body of `POST /api/predictions`. `predictions` takes either shape
/// [`TopSix`] accepts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionSubmission {
    pub race_id: String,
    #[serde(default)]
    pub team: TeamSlot,
    pub predictions: TopSix,
}

pub fn normalise_race_id(raw: &str) -> Option<String> {
    let id = raw.trim().to_lowercase();
    (!id.is_empty()).then_some(id)
}

/// Creates or replaces the caller's prediction for one team and race.
pub async fn submit_prediction(
    store: &dyn Store,
    user: &User,
    submission: PredictionSubmission,
    now: DateTime<Utc>,
) -> Result<Prediction, PredictionError> {
    let race_id = normalise_race_id(&submission.race_id).ok_or(PredictionError::MissingRaceId)?;

    let team_name = match submission.team {
        TeamSlot::Primary => user.team_name.clone(),
        TeamSlot::Secondary => user
            .secondary_team_name
            .clone()
            .ok_or(PredictionError::NoSecondaryTeam)?,
    };

    if store.get_race_result(&race_id).await?.is_some() {
        warn!("{} tried to predict {} after results", user.id, race_id);
        return Err(PredictionError::RaceClosed(race_id));
    }

    let prediction = Prediction {
        user_id: user.id.clone(),
        team_id: submission.team.team_id(&user.id),
        team_name,
        race_id,
        predictions: submission.predictions,
        submitted_at: now,
    };
    store.put_prediction(&prediction).await?;

    audit::record(
        store,
        &user.id,
        "prediction_submitted",
        json!({
            "raceId": prediction.race_id,
            "teamId": prediction.team_id,
            "predictions": prediction.predictions,
        }),
    )
    .await;
    info!("Prediction stored for {} / {}", prediction.team_id, prediction.race_id);
    Ok(prediction)
}

/// The caller's predictions for a race, primary team first.
pub async fn list_predictions(
    store: &dyn Store,
    user: &User,
    race_id: &str,
) -> Result<Vec<Prediction>, PredictionError> {
    let race_id = normalise_race_id(race_id).ok_or(PredictionError::MissingRaceId)?;
    debug!("Listing predictions of {} for {}", user.id, race_id);

    let mut found = Vec::new();
    for slot in [TeamSlot::Primary, TeamSlot::Secondary] {
        if let Some(p) = store.get_prediction(&slot.team_id(&user.id), &race_id).await? {
            found.push(p);
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RaceResult;
    use crate::store::MemoryStore;

    fn submission(team: TeamSlot, drivers: [&str; 6]) -> PredictionSubmission {
        PredictionSubmission {
            race_id: " Monaco-2025 ".to_string(),
            team,
            predictions: TopSix::from_drivers(drivers.to_vec()).unwrap(),
        }
    }

    fn user() -> User {
        let mut user = User::new("u1", "fan@example.com", Utc::now());
        user.team_name = "Box Box".to_string();
        user
    }

    const PICKS: [&str; 6] = ["ver", "nor", "lec", "pia", "sai", "ham"];

    #[tokio::test]
    async fn test_submit_upserts() {
        let store = MemoryStore::new();
        let first = submit_prediction(&store, &user(), submission(TeamSlot::Primary, PICKS), Utc::now())
            .await
            .unwrap();
        assert_eq!(first.race_id, "monaco-2025");
        assert_eq!(first.team_id, "u1");
        assert_eq!(first.team_name, "Box Box");

        let changed = ["nor", "ver", "lec", "pia", "sai", "ham"];
        submit_prediction(&store, &user(), submission(TeamSlot::Primary, changed), Utc::now())
            .await
            .unwrap();

        let stored = store.list_predictions_for_race("monaco-2025").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].predictions.drivers()[0], "nor");
    }

    #[tokio::test]
    async fn test_secondary_team_requires_name() {
        let store = MemoryStore::new();
        let mut user = user();
        assert!(matches!(
            submit_prediction(&store, &user, submission(TeamSlot::Secondary, PICKS), Utc::now()).await,
            Err(PredictionError::NoSecondaryTeam)
        ));

        user.secondary_team_name = Some("Undercut".to_string());
        let p = submit_prediction(&store, &user, submission(TeamSlot::Secondary, PICKS), Utc::now())
            .await
            .unwrap();
        assert_eq!(p.team_id, "u1-secondary");
        assert_eq!(p.team_name, "Undercut");

        submit_prediction(&store, &user, submission(TeamSlot::Primary, PICKS), Utc::now())
            .await
            .unwrap();
        let mine = list_predictions(&store, &user, "monaco-2025").await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].team_id, "u1");
    }

    #[tokio::test]
    async fn test_closed_after_results() {
        let store = MemoryStore::new();
        store
            .put_race_result(&RaceResult {
                race_id: "monaco-2025".to_string(),
                drivers: TopSix::from_drivers(PICKS.to_vec()).unwrap(),
                submitted_by: "admin".to_string(),
                submitted_at: Utc::now(),
            })
            .await
            .unwrap();

        let err = submit_prediction(&store, &user(), submission(TeamSlot::Primary, PICKS), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, PredictionError::RaceClosed(_)));
        assert_eq!(err.client_error().unwrap().status_code(), 409);
    }

    #[test]
    fn test_submission_accepts_position_map() {
        let body = serde_json::json!({
            "raceId": "spa-2025",
            "predictions": { "P1": "VER", "P2": "NOR", "P3": "LEC", "P4": "PIA", "P5": "SAI", "P6": "HAM" }
        });
        let parsed: PredictionSubmission = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.team, TeamSlot::Primary);
        assert_eq!(parsed.predictions.drivers()[0], "ver");
    }
}
