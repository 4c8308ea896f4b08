// handlers/protected/exmrs/exmr.rs - /api/exmrs/*

use axum::extract::{rejection::JsonRejection, Extension, Path, Query, State};
use axum::Json;

use crate::database::models::{Exmr, ExmrFilter};
use crate::error::extract_json;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ExmrRename, ExmrTransfer, NewExmr};
use crate::state::AppState;
use crate::types::Caller;

/// POST /api/exmrs/add - body `{ name, he_code, subject_code }`; the code
/// and region are derived from the HE
pub async fn add(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<NewExmr>, JsonRejection>,
) -> ApiResult<Exmr> {
    let request = extract_json(body)?;
    let exmr = state.exmr_service().create(&caller, request).await?;
    Ok(ApiResponse::created("EXMR added successfully", exmr))
}

/// PUT /api/exmrs/:exmr_code/update - body `{ name }`
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(exmr_code): Path<String>,
    body: Result<Json<ExmrRename>, JsonRejection>,
) -> ApiResult<Exmr> {
    let request = extract_json(body)?;
    let exmr = state.exmr_service().update(&caller, &exmr_code, request).await?;
    Ok(ApiResponse::ok("EXMR updated successfully", exmr))
}

/// DELETE /api/exmrs/:exmr_code/delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(exmr_code): Path<String>,
) -> ApiResult<Exmr> {
    let exmr = state.exmr_service().delete(&caller, &exmr_code).await?;
    Ok(ApiResponse::ok("EXMR deleted successfully", exmr))
}

/// PUT /api/exmrs/:exmr_code/transfer - body `{ new_he_code }`
pub async fn transfer(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(exmr_code): Path<String>,
    body: Result<Json<ExmrTransfer>, JsonRejection>,
) -> ApiResult<Exmr> {
    let request = extract_json(body)?;
    let exmr = state.exmr_service().transfer(&caller, &exmr_code, request).await?;
    Ok(ApiResponse::ok("EXMR transferred successfully", exmr))
}

/// GET /api/exmrs/search?he_code=&subject_code=
pub async fn search(State(state): State<AppState>, Query(filter): Query<ExmrFilter>) -> ApiResult<Vec<Exmr>> {
    let exmrs = state.exmr_service().search(filter).await?;
    Ok(ApiResponse::ok("EXMR search results", exmrs))
}
