// src/web/vital_handlers.rs
use crate::{
    error::AppResult,
    models::{
        user::CurrentUser,
        vital::{VitalFilter, VitalPayload, VitalQuery},
    },
    services::vital_service::{self, TimeOrder},
    state::AppState,
    web::{parse_id, ApiJson},
};
use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;

// POST /api/vitals
pub async fn record_vital(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<VitalPayload>,
) -> AppResult<impl IntoResponse> {
    let new_vital = payload.validate(Utc::now())?;
    let vital = vital_service::record_vital(&state.db_pool, user.id, &new_vital).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Vital recorded successfully", "vital": vital })),
    ))
}

// GET /api/vitals?vital_type&start_date&end_date
pub async fn list_vitals(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<VitalQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = VitalFilter::try_from(query)?;
    let vitals = vital_service::list_vitals(&state.db_pool, user.id, &filter, TimeOrder::NewestFirst).await?;
    Ok(Json(json!({ "vitals": vitals })))
}

// GET /api/vitals/trends?vital_type&start_date&end_date
pub async fn vital_trends(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<VitalQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = VitalFilter::try_from(query)?;
    let trends = vital_service::vital_trends(&state.db_pool, user.id, &filter).await?;
    Ok(Json(json!({ "trends": trends })))
}

// DELETE /api/vitals/{id}
pub async fn delete_vital(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let vital_id = parse_id(&raw_id, "Vital")?;
    vital_service::delete_vital(&state.db_pool, vital_id, user.id).await?;
    Ok(Json(json!({ "message": "Vital deleted successfully" })))
}
