// src/web/auth_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        non_blank,
        user::{is_plausible_email, normalize_email, AuthResponse, CurrentUser, LoginPayload, RegisterPayload},
    },
    services::{auth_service, user_service},
    state::AppState,
    web::ApiJson,
};
use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterPayload>,
) -> AppResult<impl IntoResponse> {
    let (Some(name), Some(email), Some(password)) =
        (non_blank(payload.name), non_blank(payload.email), payload.password.filter(|p| !p.is_empty()))
    else {
        return Err(AppError::validation("Name, email, and password are required"));
    };

    let email = normalize_email(&email);
    if !is_plausible_email(&email) {
        return Err(AppError::validation("Please provide a valid email address"));
    }

    tracing::info!("Registration attempt for {}", email);
    let user = user_service::create_user(&state.db_pool, &name, &email, &password).await?;
    let token = auth_service::issue_token(&user, &state.config.auth)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            token,
            user,
        }),
    ))
}

// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginPayload>,
) -> AppResult<Json<AuthResponse>> {
    let (Some(email), Some(password)) = (non_blank(payload.email), payload.password.filter(|p| !p.is_empty())) else {
        return Err(AppError::validation("Email and password are required"));
    };
    let email = normalize_email(&email);
    tracing::info!("Login attempt for {}", email);

    // Unknown email and wrong password must look the same
    let Some(user) = user_service::find_user_by_email(&state.db_pool, &email).await? else {
        tracing::warn!("Login failed: unknown email {}", email);
        return Err(AppError::InvalidCredentials);
    };
    if !auth_service::verify_password(&password, &user.password_hash).await? {
        tracing::warn!("Login failed: wrong password for {}", email);
        return Err(AppError::InvalidCredentials);
    }

    let user = CurrentUser::from(user);
    let token = auth_service::issue_token(&user, &state.config.auth)?;
    tracing::info!("Login successful for user {}", user.id);

    Ok(Json(AuthResponse {
        message: "Login successful",
        token,
        user,
    }))
}

// GET /api/auth/me
pub async fn me(Extension(user): Extension<CurrentUser>) -> impl IntoResponse {
    Json(json!({ "user": user }))
}
