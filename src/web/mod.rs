// src/web/mod.rs
pub mod auth_handlers;
pub mod mw_auth;
pub mod report_handlers;
pub mod routes;
pub mod share_handlers;
pub mod vital_handlers;

use crate::error::{AppError, AppResult};
use axum::extract::FromRequest;

/// `Json` extractor whose rejections answer with the usual `{"error": ...}` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path ids that are not positive integers can never match a row.
pub(crate) fn parse_id(raw: &str, resource: &'static str) -> AppResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(AppError::NotFound(resource))
}
