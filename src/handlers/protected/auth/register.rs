// handlers/protected/auth/register.rs - POST /api/auth/register

use axum::extract::{rejection::JsonRejection, Extension, State};
use axum::Json;

use crate::database::models::User;
use crate::error::extract_json;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::RegisterUser;
use crate::state::AppState;
use crate::types::Caller;

/**
 * POST /api/auth/register - admin creates an account
 *
 * Input: `{ "username", "password", "role": "admin"|"user", "region"? }`
 * `region` is required for `user` and discarded for `admin`.
 */
pub async fn post(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<RegisterUser>, JsonRejection>,
) -> ApiResult<User> {
    let request = extract_json(body)?;
    let user = state.user_service().register(&caller, request).await?;
    Ok(ApiResponse::created("User registered successfully", user))
}
