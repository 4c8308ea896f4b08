// handlers/protected/auth/account.rs - GET profile and users
// Mounted under both /api/auth and /api/users

use axum::extract::{Extension, State};

use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::Caller;

/// GET /api/auth/profile - the caller's own account
pub async fn profile(State(state): State<AppState>, Extension(caller): Extension<Caller>) -> ApiResult<User> {
    let user = state.user_service().profile(&caller).await?;
    Ok(ApiResponse::ok("User profile", user))
}

/// GET /api/auth/users - all accounts for admins, own region otherwise
pub async fn users(State(state): State<AppState>, Extension(caller): Extension<Caller>) -> ApiResult<Vec<User>> {
    let users = state.user_service().list(&caller).await?;
    Ok(ApiResponse::ok("Users", users))
}
