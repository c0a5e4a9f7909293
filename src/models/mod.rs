// src/models/mod.rs
pub mod report;
pub mod share;
pub mod user;
pub mod vital;

use crate::error::{AppError, AppResult};
use chrono::NaiveDate;

/// Calendar dates travel as `YYYY-MM-DD` everywhere (forms, filters, storage).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses an optional `YYYY-MM-DD` value; blank counts as absent.
pub fn parse_optional_date(raw: Option<&str>, field: &str) -> AppResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(Some)
            .map_err(|_| AppError::validation(format!("{} must be a date in YYYY-MM-DD format", field))),
        None => Ok(None),
    }
}

/// Trims a text field and turns blanks into `None`.
pub fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
