// handlers/public/root.rs - GET / and GET /health

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub const WELCOME: &str = "Welcome to the Grouplist Management System API!";

/// GET / - plain-text banner
pub async fn index() -> &'static str {
    WELCOME
}

/// GET /health - store liveness
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.store.ping().await?;

    Ok(Json(json!({
        "success": true,
        "status": "ok",
        "backend": state.store.backend(),
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
