// src/services/share_service.rs
use crate::{
    db,
    error::{AppError, AppResult},
    models::share::{SentShare, SharedAccess, ACCESS_READ},
    services::report_service,
};
use sqlx::SqlitePool;

/// Grants `email` read access to a report the caller owns.
///
/// A second grant for the same pair hits the UNIQUE(report_id, shared_with_email)
/// constraint, which comes back as "already shared".
pub async fn share_report(db_pool: &SqlitePool, report_id: i64, owner_id: i64, email: &str) -> AppResult<SharedAccess> {
    if !report_service::owns_report(db_pool, report_id, owner_id).await? {
        tracing::warn!("Share refused: report {} not found for user {}", report_id, owner_id);
        return Err(AppError::NotFound("Report"));
    }

    let result = sqlx::query_as::<_, SharedAccess>(
        r#"
        INSERT INTO shared_access (report_id, shared_with_email, access_type)
        VALUES (?1, ?2, ?3)
        RETURNING id, report_id, shared_with_email, access_type, shared_at
        "#,
    )
    .bind(report_id)
    .bind(email)
    .bind(ACCESS_READ)
    .fetch_one(db_pool)
    .await;

    match result {
        Ok(grant) => {
            tracing::info!("Report {} shared with {} (grant {}).", report_id, email, grant.id);
            Ok(grant)
        }
        Err(e) if db::is_unique_violation(&e) => {
            tracing::debug!("Report {} already shared with {}", report_id, email);
            Err(AppError::validation("Report already shared with this user"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Grants on the caller's reports, most recent first.
pub async fn list_sent_shares(db_pool: &SqlitePool, owner_id: i64) -> AppResult<Vec<SentShare>> {
    let shares = sqlx::query_as::<_, SentShare>(
        r#"
        SELECT sa.id, sa.report_id, sa.shared_with_email, sa.access_type, sa.shared_at,
               r.file_name, r.report_type, r.report_date,
               u.name AS shared_with_name
        FROM shared_access sa
        INNER JOIN reports r ON r.id = sa.report_id
        LEFT JOIN users u ON u.email = sa.shared_with_email
        WHERE r.user_id = ?1
        ORDER BY sa.shared_at DESC, sa.id DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(db_pool)
    .await?;

    tracing::debug!("User {} has {} outgoing grants.", owner_id, shares.len());
    Ok(shares)
}

/// Removes a grant; only the owner of the underlying report may do so.
pub async fn revoke_share(db_pool: &SqlitePool, share_id: i64, owner_id: i64) -> AppResult<()> {
    let rows_affected = sqlx::query(
        r#"
        DELETE FROM shared_access
        WHERE id = ?1
          AND report_id IN (SELECT id FROM reports WHERE user_id = ?2)
        "#,
    )
    .bind(share_id)
    .bind(owner_id)
    .execute(db_pool)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("Revoke refused: grant {} not found for user {}", share_id, owner_id);
        return Err(AppError::NotFound("Share"));
    }
    tracing::info!("Grant {} revoked by user {}.", share_id, owner_id);
    Ok(())
}
