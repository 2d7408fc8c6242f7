// handlers/mod.rs - 3-tier handler layout
//
// Public (no auth) → Protected (JWT + user document) → Elevated (admin + verified cookie)
pub mod elevated;
pub mod protected;
pub mod public;
