// src/services/vital_service.rs
use crate::{
    error::{AppError, AppResult},
    models::vital::{to_storage_timestamp, NewVital, TrendPoint, Vital, VitalFilter},
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeMap;

/// Sort direction of a vitals read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOrder {
    NewestFirst,
    OldestFirst,
}

pub async fn record_vital(db_pool: &SqlitePool, user_id: i64, vital: &NewVital) -> AppResult<Vital> {
    tracing::debug!("Recording {} = {} for user {}", vital.vital_type, vital.value, user_id);
    let saved = sqlx::query_as::<_, Vital>(
        r#"
        INSERT INTO vitals (user_id, vital_type, value, recorded_at)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id, user_id, vital_type, value, recorded_at
        "#,
    )
    .bind(user_id)
    .bind(vital.vital_type.as_str())
    .bind(vital.value)
    .bind(to_storage_timestamp(&vital.recorded_at))
    .fetch_one(db_pool)
    .await?;

    tracing::info!("Vital {} recorded for user {}.", saved.id, user_id);
    Ok(saved)
}

/// The caller's vitals matching `filter`. Date bounds are inclusive calendar days.
pub async fn list_vitals(db_pool: &SqlitePool, user_id: i64, filter: &VitalFilter, order: TimeOrder) -> AppResult<Vec<Vital>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id, user_id, vital_type, value, recorded_at FROM vitals WHERE user_id = ");
    query.push_bind(user_id);

    if let Some(vital_type) = filter.vital_type {
        query.push(" AND vital_type = ").push_bind(vital_type.as_str());
    }
    if let Some(start) = filter.start_date {
        query.push(" AND DATE(recorded_at) >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        query.push(" AND DATE(recorded_at) <= ").push_bind(end);
    }

    query.push(match order {
        TimeOrder::NewestFirst => " ORDER BY recorded_at DESC, id DESC",
        TimeOrder::OldestFirst => " ORDER BY recorded_at ASC, id ASC",
    });

    let vitals = query.build_query_as::<Vital>().fetch_all(db_pool).await?;
    tracing::debug!("Found {} vitals for user {}.", vitals.len(), user_id);
    Ok(vitals)
}

/// Chart data: one ascending series per vital type.
pub async fn vital_trends(db_pool: &SqlitePool, user_id: i64, filter: &VitalFilter) -> AppResult<BTreeMap<String, Vec<TrendPoint>>> {
    let vitals = list_vitals(db_pool, user_id, filter, TimeOrder::OldestFirst).await?;
    Ok(group_trends(vitals))
}

/// Splits a time-ordered list into per-type series, keeping the order.
pub fn group_trends(vitals: Vec<Vital>) -> BTreeMap<String, Vec<TrendPoint>> {
    let mut trends: BTreeMap<String, Vec<TrendPoint>> = BTreeMap::new();
    for vital in vitals {
        trends.entry(vital.vital_type).or_default().push(TrendPoint {
            value: vital.value,
            date: vital.recorded_at,
        });
    }
    trends
}

/// Owner-scoped delete; zero rows affected is reported as not found.
pub async fn delete_vital(db_pool: &SqlitePool, vital_id: i64, user_id: i64) -> AppResult<()> {
    let rows_affected = sqlx::query("DELETE FROM vitals WHERE id = ?1 AND user_id = ?2")
        .bind(vital_id)
        .bind(user_id)
        .execute(db_pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("Delete refused: vital {} not found for user {}", vital_id, user_id);
        return Err(AppError::NotFound("Vital"));
    }
    tracing::info!("Vital {} deleted by user {}.", vital_id, user_id);
    Ok(())
}
