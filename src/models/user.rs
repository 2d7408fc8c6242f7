use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub team_name: String,
    pub secondary_team_name: Option<String>,
    pub is_admin: bool,
    pub must_change_pin: bool,
    pub providers: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A fresh, non-admin user. The team name defaults to the email's local part.
    pub fn new(id: impl Into<String>, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        let email = email.into();
        let team_name = email.split('@').next().unwrap_or_default().to_string();
        Self {
            id: id.into(),
            email,
            team_name,
            secondary_team_name: None,
            is_admin: false,
            must_change_pin: false,
            providers: vec!["password".to_string()],
            created_at: now,
        }
    }

    /// Every team name this user holds.
    pub fn team_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.team_name.as_str()).chain(self.secondary_team_name.as_deref())
    }

    pub fn email_matches(&self, other: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(other.trim())
    }
}
