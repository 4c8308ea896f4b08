// handlers/mod.rs - Handler tiers
//
// Public (no auth): banner, health, login/logout
// Protected (JWT auth): accounts, HE registry, EXMR registry

pub mod protected;
pub mod public;
