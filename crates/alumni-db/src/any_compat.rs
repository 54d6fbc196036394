//! AnyPool row-extraction and binding helpers.
//!
//! `sqlx::AnyPool` only natively decodes primitive types (i64, f64, bool,
//! String, bytes). UUIDs, timestamps and the embedded JSON documents are all
//! stored as TEXT and converted here, which keeps the schema identical on
//! SQLite and PostgreSQL.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{Row, any::AnyRow};
use uuid::Uuid;

// ── Uuid ─────────────────────────────────────────────────────────────────────

pub fn get_uuid(row: &AnyRow, col: &str) -> Result<Uuid, sqlx::Error> {
    let s: String = row.try_get(col)?;
    Uuid::parse_str(&s).map_err(|e| sqlx::Error::Decode(Box::new(e) as _))
}

// ── DateTime<Utc> ─────────────────────────────────────────────────────────────

/// Timestamps are written as fixed-width RFC 3339 in UTC so that string
/// comparison in SQL (`ORDER BY`) matches chronological order.
pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn get_datetime(row: &AnyRow, col: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let s: String = row.try_get(col)?;
    parse_datetime(&s).map_err(sqlx::Error::Decode)
}

pub fn get_opt_datetime(row: &AnyRow, col: &str) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let s: Option<String> = row.try_get(col)?;
    s.map(|v| parse_datetime(&v).map_err(sqlx::Error::Decode))
        .transpose()
}

fn parse_datetime(
    s: &str,
) -> Result<DateTime<Utc>, Box<dyn std::error::Error + Send + Sync + 'static>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Rows written by hand in a SQLite shell: "2024-01-15 10:30:00"
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(dt.and_utc());
    }
    Err(format!("cannot parse timestamp: {s}").into())
}

// ── Embedded JSON documents ──────────────────────────────────────────────────

/// Decode a JSON TEXT column into any deserializable type.
/// Empty strings decode as the type's default (e.g. an empty list).
pub fn get_json<T: DeserializeOwned + Default>(row: &AnyRow, col: &str) -> Result<T, sqlx::Error> {
    let s: String = row.try_get(col)?;
    if s.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&s).map_err(|e| sqlx::Error::Decode(Box::new(e) as _))
}

/// Encode a value for a JSON TEXT column.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Encode(Box::new(e) as _))
}

// ── Booleans ─────────────────────────────────────────────────────────────────

/// Flags are stored as BIGINT 0/1 so both backends decode them the same way.
pub fn get_flag(row: &AnyRow, col: &str) -> Result<bool, sqlx::Error> {
    let v: i64 = row.try_get(col)?;
    Ok(v != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let early = DateTime::parse_from_rfc3339("2024-01-15T09:05:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let late = early + chrono::Duration::milliseconds(1500);
        assert!(format_datetime(early) < format_datetime(late));
        assert_eq!(format_datetime(early).len(), format_datetime(late).len());
    }

    #[test]
    fn parses_both_timestamp_shapes() {
        let a = parse_datetime("2024-01-15T10:30:00.000000Z").unwrap();
        let b = parse_datetime("2024-01-15 10:30:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_datetime("yesterday").is_err());
    }
}
