// handlers/protected/mod.rs - Endpoints behind jwt_auth_middleware
//
// Every handler here receives the verified `Caller` through
// `Extension<Caller>` and passes it to the service layer explicitly.

pub mod auth;
pub mod exmrs;
pub mod hes;
