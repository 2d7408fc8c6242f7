use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct League {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub member_user_ids: Vec<String>,
    pub is_global: bool,
    pub created_at: DateTime<Utc>,
}

impl League {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.is_global || self.member_user_ids.iter().any(|m| m == user_id)
    }
}
