//! Helpers shared by the unit tests.

use crate::{config::DatabaseConfig, db::create_db_pool, models::user::CurrentUser, services::user_service};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Fresh, migrated SQLite database inside `dir`.
pub async fn create_test_pool(dir: &TempDir) -> SqlitePool {
    create_db_pool(&DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("test.db").display()),
        max_connections: 1,
    })
    .await
    .expect("Failed to create test database")
}

pub async fn create_test_user(pool: &SqlitePool, email: &str) -> CurrentUser {
    user_service::create_user(pool, "Test User", email, "password123")
        .await
        .expect("Failed to create test user")
}
