// handlers/public/auth/login.rs - POST /api/auth/login

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde_json::{json, Value};

use crate::error::{extract_json, ApiError};
use crate::services::LoginRequest;
use crate::state::AppState;

/**
 * POST /api/auth/login - exchange credentials for a JWT
 *
 * Input: `{ "username": "...", "password": "..." }`
 * Output: `{ "success": true, "message": "Login successful", "token": "...", "expires_in": 3600 }`
 *
 * Unknown usernames are 404, wrong passwords 401.
 */
pub async fn post(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = extract_json(body)?;
    let issued = state.user_service().login(request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": issued.token,
        "expires_in": issued.expires_in,
    })))
}
