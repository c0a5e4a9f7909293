// src/models/vital.rs
use crate::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};

/// The fixed vocabulary of measurements the wallet accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VitalType {
    #[serde(rename = "BP")]
    BloodPressure,
    #[serde(rename = "Sugar")]
    Sugar,
    #[serde(rename = "Heart Rate")]
    HeartRate,
    #[serde(rename = "Oxygen")]
    Oxygen,
    #[serde(rename = "Temperature")]
    Temperature,
    #[serde(rename = "Weight")]
    Weight,
}

impl VitalType {
    pub const ALL: [VitalType; 6] = [
        VitalType::BloodPressure,
        VitalType::Sugar,
        VitalType::HeartRate,
        VitalType::Oxygen,
        VitalType::Temperature,
        VitalType::Weight,
    ];

    /// Name used on the wire and in the `vital_type` columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            VitalType::BloodPressure => "BP",
            VitalType::Sugar => "Sugar",
            VitalType::HeartRate => "Heart Rate",
            VitalType::Oxygen => "Oxygen",
            VitalType::Temperature => "Temperature",
            VitalType::Weight => "Weight",
        }
    }

    /// Parses an optional filter value; blank means no filter.
    pub fn parse_optional(raw: Option<&str>) -> AppResult<Option<VitalType>> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => value.parse().map(Some),
            None => Ok(None),
        }
    }
}

impl FromStr for VitalType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VitalType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| AppError::validation("Invalid vital type"))
    }
}

impl fmt::Display for VitalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Row from the 'vitals' table
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Vital {
    pub id: i64,
    pub user_id: i64,
    pub vital_type: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// A validated measurement ready to insert.
#[derive(Debug, Clone)]
pub struct NewVital {
    pub vital_type: VitalType,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

// JSON body for POST /api/vitals
#[derive(Debug, Deserialize)]
pub struct VitalPayload {
    pub vital_type: Option<String>,
    /// Number or numeric string; forms often send the latter.
    pub value: Option<serde_json::Value>,
    pub recorded_at: Option<String>,
}

impl VitalPayload {
    pub fn validate(self, now: DateTime<Utc>) -> AppResult<NewVital> {
        let vital_type = self.vital_type.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let value = self.value.filter(|v| !v.is_null());
        let (Some(vital_type), Some(value)) = (vital_type, value) else {
            return Err(AppError::validation("Vital type and value are required"));
        };

        let vital_type: VitalType = vital_type.parse()?;
        let value = parse_value(&value)?;
        let recorded_at = match self.recorded_at.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => parse_recorded_at(raw)?,
            None => now,
        };

        Ok(NewVital {
            vital_type,
            value,
            recorded_at,
        })
    }
}

fn parse_value(value: &serde_json::Value) -> AppResult<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::validation("Vital value must be a number"))
}

/// Accepts RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM[:SS]` which is taken as UTC.
pub fn parse_recorded_at(raw: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 4] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::validation("recorded_at must be an ISO 8601 date-time"))
}

/// Storage form of a timestamp: fixed-width UTC so text order equals time order.
pub fn to_storage_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Filters shared by the list and trends endpoints.
#[derive(Debug, Clone, Default)]
pub struct VitalFilter {
    pub vital_type: Option<VitalType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// Raw query string for GET /api/vitals and /api/vitals/trends
#[derive(Debug, Default, Deserialize)]
pub struct VitalQuery {
    pub vital_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl TryFrom<VitalQuery> for VitalFilter {
    type Error = AppError;

    fn try_from(query: VitalQuery) -> AppResult<Self> {
        Ok(VitalFilter {
            vital_type: VitalType::parse_optional(query.vital_type.as_deref())?,
            start_date: super::parse_optional_date(query.start_date.as_deref(), "start_date")?,
            end_date: super::parse_optional_date(query.end_date.as_deref(), "end_date")?,
        })
    }
}

/// One point on a trend chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub value: f64,
    pub date: DateTime<Utc>,
}
