//! Datetime helpers.
//!
//! Stored timestamps use a fixed-width RFC3339 form (`2026-01-02T03:04:05.678Z`)
//! so that lexical order equals chronological order in SQL comparisons.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::error::{CoreError, CoreResult};

/// Formats a timestamp in the fixed-width storage form.
#[must_use]
pub fn to_storage(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses any RFC3339 timestamp into UTC.
///
/// `field` names the column in the error message.
pub fn from_storage(value: &str, field: &str) -> CoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::SerializationError(format!("Invalid {field}: {e}")))
}

/// Parses an optional RFC3339 column.
pub fn from_storage_opt(value: Option<&str>, field: &str) -> CoreResult<Option<DateTime<Utc>>> {
    value.map(|v| from_storage(v, field)).transpose()
}

/// `at + minutes`, truncated to the storage precision.
#[must_use]
pub fn plus_minutes(at: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
    truncate_millis(at + Duration::minutes(i64::from(minutes)))
}

/// Drops sub-millisecond precision so values survive a storage round trip unchanged.
#[must_use]
pub fn truncate_millis(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or(dt)
}
