// src/models/share.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Only read access exists today; the column leaves room for more.
pub const ACCESS_READ: &str = "read";

// Row from the 'shared_access' table (a grant)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SharedAccess {
    pub id: i64,
    pub report_id: i64,
    pub shared_with_email: String,
    pub access_type: String,
    pub shared_at: Option<NaiveDateTime>,
}

/// A grant the caller gave out, with enough report context to list it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SentShare {
    pub id: i64,
    pub report_id: i64,
    pub shared_with_email: String,
    pub access_type: String,
    pub shared_at: Option<NaiveDateTime>,
    pub file_name: String,
    pub report_type: String,
    pub report_date: NaiveDate,
    // NULL when the recipient has no account (yet)
    pub shared_with_name: Option<String>,
}

// JSON body for POST /api/share
#[derive(Debug, Deserialize)]
pub struct SharePayload {
    pub report_id: Option<i64>,
    pub shared_with_email: Option<String>,
}
