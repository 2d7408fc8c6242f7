use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub user_id: String,
    pub team_id: String,
    pub team_name: String,
    pub race_id: String,
    pub total_points: u32,
    pub breakdown: String,
    pub calculated_at: DateTime<Utc>,
}

impl Score {
    /// One score per team and race: `(team_id, race_id)`.
    pub fn key(&self) -> (String, String) {
        (self.team_id.clone(), self.race_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub rank: usize,
    pub user_id: String,
    pub team_id: String,
    pub team_name: String,
    pub total_points: u32,
    pub races_scored: usize,
}
