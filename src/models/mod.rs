pub mod challenge;
pub mod league;
pub mod logs;
pub mod prediction;
pub mod presence;
pub mod score;
pub mod user;

pub use challenge::{AdminChallenge, ChallengeAttempt};
pub use league::League;
pub use logs::{AttackAlert, AuditEntry, EmailLogEntry, EmailStatus, ErrorLogEntry};
pub use prediction::{Prediction, RaceResult, TeamSlot};
pub use presence::{Presence, PresenceSession};
pub use score::{Score, Standing};
pub use user::User;
