// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Middleware: None
pub mod health;
pub mod pub_chat;
pub mod root;

pub use health::health;
pub use pub_chat::pub_chat_get;
pub use root::root;
