pub mod auth;
pub mod paddock;
pub mod scoring;
pub mod store;
