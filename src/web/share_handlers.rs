// src/web/share_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        non_blank,
        share::SharePayload,
        user::{is_plausible_email, normalize_email, CurrentUser},
    },
    services::share_service,
    state::AppState,
    web::{parse_id, ApiJson},
};
use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

// POST /api/share
pub async fn share_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<SharePayload>,
) -> AppResult<impl IntoResponse> {
    let (Some(report_id), Some(email)) = (payload.report_id, non_blank(payload.shared_with_email)) else {
        return Err(AppError::validation("Report ID and email are required"));
    };
    let email = normalize_email(&email);
    if !is_plausible_email(&email) {
        return Err(AppError::validation("Please provide a valid email address"));
    }

    let share = share_service::share_report(&state.db_pool, report_id, user.id, &email).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Report shared successfully", "share": share })),
    ))
}

// GET /api/share/sent
pub async fn list_sent_shares(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let shares = share_service::list_sent_shares(&state.db_pool, user.id).await?;
    Ok(Json(json!({ "shares": shares })))
}

// DELETE /api/share/{id}
pub async fn revoke_share(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let share_id = parse_id(&raw_id, "Share")?;
    share_service::revoke_share(&state.db_pool, share_id, user.id).await?;
    Ok(Json(json!({ "message": "Access revoked successfully" })))
}
