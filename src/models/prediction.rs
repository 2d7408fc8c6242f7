use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::TopSix;

/// Which of a user's two teams a prediction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSlot {
    #[default]
    Primary,
    Secondary,
}

impl TeamSlot {
    pub fn team_id(&self, user_id: &str) -> String {
        match self {
            TeamSlot::Primary => user_id.to_string(),
            TeamSlot::Secondary => format!("{}-secondary", user_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub user_id: String,
    pub team_id: String,
    pub team_name: String,
    pub race_id: String,
    pub predictions: TopSix,
    pub submitted_at: DateTime<Utc>,
}

/// Official top-six finishing order for a race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceResult {
    pub race_id: String,
    pub drivers: TopSix,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
}
