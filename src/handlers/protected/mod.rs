// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Security Level: Bearer JWT, resolved to a user document
// Route Prefix: /api
// Middleware: jwt_auth_middleware → current_user_middleware
pub mod admin;
pub mod leagues;
pub mod predictions;
pub mod presence;
pub mod scores;
pub mod users;

pub use admin::{challenge_post, verify_post};
pub use leagues::{league_join, league_leave, league_post, leagues_get};
pub use predictions::{prediction_post, predictions_get};
pub use presence::{heartbeat_post, session_delete};
pub use scores::{scores_get, standings_get};
pub use users::{me_get, me_put};
