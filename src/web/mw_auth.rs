// src/web/mw_auth.rs
use crate::{
    error::AppError,
    services::{auth_service, user_service},
    state::AppState,
};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

// Middleware that requires a valid bearer token for a user that still exists
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        tracing::debug!("Auth MW: no bearer token on {}", request.uri().path());
        AppError::MissingToken
    })?;

    let claims = auth_service::decode_token(token, &state.config.auth)?;

    // Tokens outlive accounts; re-check the user on every request
    let user = user_service::find_user_by_id(&state.db_pool, claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Auth MW: token for deleted user {}", claims.sub);
            AppError::StaleToken
        })?;

    tracing::debug!("Auth MW: user {} authenticated.", user.id);
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Extracts `<token>` from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
