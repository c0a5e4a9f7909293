// src/models/report.rs
use super::vital::VitalType;
use crate::error::{AppError, AppResult};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::path::Path;

/// Extensions the upload form offers; anything else is refused.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "gif"];

/// Public mount point of the upload directory.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// A report row, optionally joined with its tags and owner.
#[derive(Debug, Clone, FromRow)]
pub struct ReportRow {
    pub id: i64,
    pub user_id: i64,
    pub file_path: String,
    pub file_name: String,
    pub report_type: String,
    pub report_date: NaiveDate,
    pub created_at: Option<NaiveDateTime>,
    // GROUP_CONCAT of report_vitals.vital_type, NULL when untagged
    #[sqlx(default)]
    pub associated_vitals: Option<String>,
    #[sqlx(default)]
    pub owner_name: Option<String>,
    #[sqlx(default)]
    pub owner_email: Option<String>,
}

/// Report as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: i64,
    pub user_id: i64,
    pub file_name: String,
    pub report_type: String,
    pub report_date: NaiveDate,
    pub created_at: Option<NaiveDateTime>,
    pub associated_vitals: Vec<String>,
    pub file_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
}

impl From<ReportRow> for Report {
    fn from(row: ReportRow) -> Self {
        let file_url = file_url(row.user_id, &row.file_path);
        let mut associated_vitals: Vec<String> = row
            .associated_vitals
            .as_deref()
            .map(|tags| tags.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        associated_vitals.sort();

        Self {
            id: row.id,
            user_id: row.user_id,
            file_name: row.file_name,
            report_type: row.report_type,
            report_date: row.report_date,
            created_at: row.created_at,
            associated_vitals,
            file_url,
            owner_name: row.owner_name,
            owner_email: row.owner_email,
        }
    }
}

/// `/uploads/<owner id>/<stored file name>`
pub fn file_url(user_id: i64, file_path: &str) -> String {
    let stored_name = Path::new(file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}/{}", UPLOADS_ROUTE, user_id, stored_name)
}

/// Lowercased extension of an uploaded file name, if it is one we accept.
pub fn allowed_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Metadata of an upload whose file is already on disk.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub file_path: String,
    pub file_name: String,
    pub report_type: String,
    pub report_date: NaiveDate,
    pub vital_types: Vec<VitalType>,
}

/// Parses `vital_types` form values: repeated fields and/or comma-separated lists.
pub fn parse_vital_tags<'a>(values: impl IntoIterator<Item = &'a str>) -> AppResult<Vec<VitalType>> {
    let mut tags = Vec::new();
    for raw in values.into_iter().flat_map(|v| v.split(',')) {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let tag: VitalType = raw.parse()?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

/// Filters for GET /api/reports.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub report_type: Option<String>,
    pub vital_type: Option<VitalType>,
    pub limit: Option<i64>,
}

// Raw query string for GET /api/reports
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub report_type: Option<String>,
    pub vital_type: Option<String>,
    pub limit: Option<String>,
}

impl TryFrom<ReportQuery> for ReportFilter {
    type Error = AppError;

    fn try_from(query: ReportQuery) -> AppResult<Self> {
        let limit = match super::non_blank(query.limit) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n > 0 => Some(n),
                _ => return Err(AppError::validation("limit must be a positive integer")),
            },
            None => None,
        };

        Ok(ReportFilter {
            start_date: super::parse_optional_date(query.start_date.as_deref(), "start_date")?,
            end_date: super::parse_optional_date(query.end_date.as_deref(), "end_date")?,
            report_type: super::non_blank(query.report_type),
            vital_type: VitalType::parse_optional(query.vital_type.as_deref())?,
            limit,
        })
    }
}
