// handlers/public/auth/logout.rs - POST /api/auth/logout

use axum::{
    http::header,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::middleware::auth::TOKEN_COOKIE;

/// POST /api/auth/logout - expires the `token` cookie; tokens themselves stay
/// valid until `exp`
pub async fn post() -> impl IntoResponse {
    let expired = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict", TOKEN_COOKIE);

    (
        [(header::SET_COOKIE, expired)],
        Json(json!({
            "success": true,
            "message": "Logout successful",
        })),
    )
}
