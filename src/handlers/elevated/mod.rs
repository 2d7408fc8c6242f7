// handlers/elevated/mod.rs - Elevated handlers (verified admin required)
//
// Security Level: JWT + is_admin + adminVerified cookie
// Route Prefix: /admin
// Middleware: jwt_auth_middleware → current_user_middleware → admin_verified_middleware
pub mod logs;
pub mod pub_chat;
pub mod results;

pub use logs::{audit_logs_get, error_logs_get};
pub use pub_chat::pub_chat_put;
pub use results::{recalculate_post, result_post};
