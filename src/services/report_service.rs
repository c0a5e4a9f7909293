// src/services/report_service.rs
use crate::{
    error::{AppError, AppResult},
    models::report::{NewReport, Report, ReportFilter, ReportRow},
    services::storage,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;

// Report columns plus the tag list; every read goes through this projection
const REPORT_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.file_path, r.file_name, r.report_type, r.report_date, r.created_at,
           GROUP_CONCAT(rv.vital_type) AS associated_vitals
    FROM reports r
    LEFT JOIN report_vitals rv ON rv.report_id = r.id
"#;

/// Inserts the report row and its vital tags in one transaction.
pub async fn create_report(db_pool: &SqlitePool, user_id: i64, report: &NewReport) -> AppResult<Report> {
    tracing::info!("Saving report '{}' for user {}", report.file_name, user_id);
    let mut tx = db_pool.begin().await?;

    let mut row = sqlx::query_as::<_, ReportRow>(
        r#"
        INSERT INTO reports (user_id, file_path, file_name, report_type, report_date)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id, user_id, file_path, file_name, report_type, report_date, created_at
        "#,
    )
    .bind(user_id)
    .bind(&report.file_path)
    .bind(&report.file_name)
    .bind(&report.report_type)
    .bind(report.report_date)
    .fetch_one(&mut *tx)
    .await?;

    for tag in &report.vital_types {
        sqlx::query("INSERT OR IGNORE INTO report_vitals (report_id, vital_type) VALUES (?1, ?2)")
            .bind(row.id)
            .bind(tag.as_str())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    if !report.vital_types.is_empty() {
        let tags: Vec<&str> = report.vital_types.iter().map(|t| t.as_str()).collect();
        row.associated_vitals = Some(tags.join(","));
    }
    tracing::info!("Report {} saved.", row.id);
    Ok(row.into())
}

/// The caller's own reports, newest report date first.
pub async fn list_reports(db_pool: &SqlitePool, user_id: i64, filter: &ReportFilter) -> AppResult<Vec<Report>> {
    tracing::debug!("Listing reports for user {} with {:?}", user_id, filter);
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(REPORT_SELECT);
    query.push(" WHERE r.user_id = ").push_bind(user_id);

    if let Some(start) = filter.start_date {
        query.push(" AND r.report_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        query.push(" AND r.report_date <= ").push_bind(end);
    }
    if let Some(report_type) = &filter.report_type {
        query.push(" AND r.report_type = ").push_bind(report_type.clone());
    }
    if let Some(vital_type) = filter.vital_type {
        // Filter on the tag relation itself so the concatenated list stays complete
        query
            .push(" AND EXISTS (SELECT 1 FROM report_vitals tag WHERE tag.report_id = r.id AND tag.vital_type = ")
            .push_bind(vital_type.as_str())
            .push(")");
    }

    query.push(" GROUP BY r.id ORDER BY r.report_date DESC, r.id DESC");
    if let Some(limit) = filter.limit {
        query.push(" LIMIT ").push_bind(limit);
    }

    let rows = query.build_query_as::<ReportRow>().fetch_all(db_pool).await?;
    tracing::debug!("Found {} reports.", rows.len());
    Ok(rows.into_iter().map(Report::from).collect())
}

/// Reports other people shared with `email`, with owner details.
pub async fn list_shared_reports(db_pool: &SqlitePool, email: &str) -> AppResult<Vec<Report>> {
    tracing::debug!("Listing reports shared with {}", email);
    let rows = sqlx::query_as::<_, ReportRow>(
        r#"
        SELECT r.id, r.user_id, r.file_path, r.file_name, r.report_type, r.report_date, r.created_at,
               (SELECT GROUP_CONCAT(rv.vital_type) FROM report_vitals rv WHERE rv.report_id = r.id) AS associated_vitals,
               u.name AS owner_name,
               u.email AS owner_email
        FROM reports r
        INNER JOIN shared_access sa ON sa.report_id = r.id
        INNER JOIN users u ON u.id = r.user_id
        WHERE sa.shared_with_email = ?1
        ORDER BY r.report_date DESC, r.id DESC
        "#,
    )
    .bind(email)
    .fetch_all(db_pool)
    .await?;

    Ok(rows.into_iter().map(Report::from).collect())
}

/// A report the caller owns or was granted. `None` covers both "missing" and "not yours".
pub async fn find_visible_report(db_pool: &SqlitePool, report_id: i64, user_id: i64, email: &str) -> AppResult<Option<Report>> {
    let sql = format!(
        r#"{REPORT_SELECT}
        WHERE r.id = ?1
          AND (r.user_id = ?2 OR EXISTS (
                SELECT 1 FROM shared_access sa
                WHERE sa.report_id = r.id AND sa.shared_with_email = ?3))
        GROUP BY r.id
        "#
    );
    let row = sqlx::query_as::<_, ReportRow>(&sql)
        .bind(report_id)
        .bind(user_id)
        .bind(email)
        .fetch_optional(db_pool)
        .await?;

    Ok(row.map(Report::from))
}

/// Checks that `user_id` owns the report.
pub async fn owns_report(db_pool: &SqlitePool, report_id: i64, user_id: i64) -> AppResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM reports WHERE id = ?1 AND user_id = ?2")
        .bind(report_id)
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(found.is_some())
}

/// Owner-only delete: file first (best effort), then the row. Grants and tags cascade.
pub async fn delete_report(db_pool: &SqlitePool, report_id: i64, user_id: i64) -> AppResult<()> {
    let file_path: Option<String> = sqlx::query_scalar("SELECT file_path FROM reports WHERE id = ?1 AND user_id = ?2")
        .bind(report_id)
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?;

    let Some(file_path) = file_path else {
        tracing::warn!("Delete refused: report {} not found for user {}", report_id, user_id);
        return Err(AppError::NotFound("Report"));
    };

    storage::remove_file(Path::new(&file_path)).await;

    sqlx::query("DELETE FROM reports WHERE id = ?1")
        .bind(report_id)
        .execute(db_pool)
        .await?;

    tracing::info!("Report {} deleted by user {}.", report_id, user_id);
    Ok(())
}
