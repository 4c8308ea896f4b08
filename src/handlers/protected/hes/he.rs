// handlers/protected/hes/he.rs - /api/hes/*

use axum::extract::{rejection::JsonRejection, Extension, Path, Query, State};
use axum::Json;

use crate::database::models::{He, HeFilter, HePatch};
use crate::error::extract_json;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::NewHe;
use crate::state::AppState;
use crate::types::Caller;

/// POST /api/hes/add - body `{ he_code, name, subject_code, region? }`.
/// Regional users always create in their own region.
pub async fn add(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<NewHe>, JsonRejection>,
) -> ApiResult<He> {
    let request = extract_json(body)?;
    let he = state.he_service().create(&caller, request).await?;
    Ok(ApiResponse::created("HE added successfully", he))
}

/// PUT /api/hes/:he_code/update - body `{ name?, subject_code? }`
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(he_code): Path<String>,
    body: Result<Json<HePatch>, JsonRejection>,
) -> ApiResult<He> {
    let patch = extract_json(body)?;
    let he = state.he_service().update(&caller, &he_code, patch).await?;
    Ok(ApiResponse::ok("HE updated successfully", he))
}

/// DELETE /api/hes/:he_code/delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(he_code): Path<String>,
) -> ApiResult<He> {
    let he = state.he_service().delete(&caller, &he_code).await?;
    Ok(ApiResponse::ok("HE deleted successfully", he))
}

/// GET /api/hes/search?subject_code=&he_code=
pub async fn search(State(state): State<AppState>, Query(filter): Query<HeFilter>) -> ApiResult<Vec<He>> {
    let hes = state.he_service().search(filter).await?;
    Ok(ApiResponse::ok("HE search results", hes))
}
