// src/services/user_service.rs
use crate::{
    db,
    error::{AppError, AppResult},
    models::user::{CurrentUser, User, DEFAULT_ROLE},
};
use sqlx::SqlitePool;

/// Looks up the public user record by id (used on every authenticated request).
pub async fn find_user_by_id(db_pool: &SqlitePool, user_id: i64) -> AppResult<Option<CurrentUser>> {
    tracing::debug!("Looking up user by id: {}", user_id);
    let user = sqlx::query_as::<_, CurrentUser>(
        r#"
        SELECT id, name, email, role
        FROM users
        WHERE id = ?1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db_pool)
    .await?;

    if user.is_none() {
        tracing::debug!("User {} not found.", user_id);
    }
    Ok(user)
}

/// Full row including the password hash, for login.
pub async fn find_user_by_email(db_pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    tracing::debug!("Looking up user by email: {}", email);
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password_hash, role, created_at
        FROM users
        WHERE email = ?1
        "#,
    )
    .bind(email)
    .fetch_optional(db_pool)
    .await?;
    Ok(user)
}

/// Creates an account. `email` must already be normalised.
pub async fn create_user(db_pool: &SqlitePool, name: &str, email: &str, raw_password: &str) -> AppResult<CurrentUser> {
    tracing::info!("Creating user: {}", email);
    let password_hash = crate::services::auth_service::hash_password(raw_password).await?;

    // The UNIQUE index on email decides; no check-then-insert
    let result = sqlx::query_as::<_, CurrentUser>(
        r#"
        INSERT INTO users (name, email, password_hash, role)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id, name, email, role
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(&password_hash)
    .bind(DEFAULT_ROLE)
    .fetch_one(db_pool)
    .await;

    match result {
        Ok(user) => {
            tracing::info!("User {} created with id {}.", email, user.id);
            Ok(user)
        }
        Err(e) if db::is_unique_violation(&e) => {
            tracing::warn!("Registration refused: {} already exists.", email);
            Err(AppError::validation("User with this email already exists"))
        }
        Err(e) => Err(e.into()),
    }
}
