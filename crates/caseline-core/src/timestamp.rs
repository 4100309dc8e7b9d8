//! Timestamp normalization across inconsistent upstream formats.
//!
//! Upstream sources disagree about almost everything: epoch seconds,
//! epoch milliseconds, ISO-8601 with or without fractional seconds or a
//! zone offset, SQL-style `date space time`, and two localized
//! date-first layouts. Everything funnels through here into a canonical
//! `DateTime<Utc>`. A value that defeats every parser is a non-fatal
//! condition: the caller skips the event and logs a warning.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Raw fields probed for a timestamp, in priority order.
pub const TIMESTAMP_FIELDS: &[&str] = &[
    "timestamp",
    "@timestamp",
    "time",
    "event_time",
    "created_at",
    "occurred_at",
    "_time",
];

/// Numeric epoch values above this magnitude are treated as milliseconds.
const EPOCH_MILLIS_CUTOFF: f64 = 1e10;

/// Explicit text formats tried in priority order; first match wins. The
/// flag marks formats that carry a zone offset. Naive results are
/// assumed UTC.
const TEXT_FORMATS: &[(&str, bool)] = &[
    ("%Y-%m-%dT%H:%M:%S%.fZ", false),
    ("%Y-%m-%dT%H:%M:%SZ", false),
    ("%Y-%m-%dT%H:%M:%S%.f%z", true),
    ("%Y-%m-%dT%H:%M:%S%z", true),
    ("%Y-%m-%d %H:%M:%S%.f", false),
    ("%Y-%m-%d %H:%M:%S", false),
    ("%d/%m/%Y %H:%M:%S", false),
    ("%m/%d/%Y %H:%M:%S", false),
];

/// A timestamp value that could not be normalized.
#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("unparseable timestamp value: {0}")]
    Unparseable(String),
    #[error("epoch value out of representable range: {0}")]
    OutOfRange(f64),
}

/// Locate the raw timestamp field in a record, probing
/// [`TIMESTAMP_FIELDS`] in order.
pub fn find_timestamp_field(raw: &Map<String, Value>) -> Option<(&'static str, &Value)> {
    TIMESTAMP_FIELDS
        .iter()
        .find_map(|field| raw.get(*field).map(|value| (*field, value)))
}

/// Normalize an arbitrary JSON timestamp value to a UTC instant.
///
/// Numbers are interpreted as epoch values (seconds, or milliseconds
/// above the cutoff); strings run through the explicit format list and
/// then a flexible RFC 3339 parse as last resort.
pub fn normalize_timestamp(value: &Value) -> Result<DateTime<Utc>, TimestampError> {
    match value {
        Value::Number(n) => {
            let raw = n
                .as_f64()
                .ok_or_else(|| TimestampError::Unparseable(n.to_string()))?;
            from_epoch(raw)
        }
        Value::String(s) => parse_text(s.trim()),
        other => Err(TimestampError::Unparseable(other.to_string())),
    }
}

/// Interpret a numeric value as an epoch timestamp. Values above
/// [`EPOCH_MILLIS_CUTOFF`] are milliseconds; everything else is seconds.
/// Fractional seconds survive to millisecond precision.
fn from_epoch(raw: f64) -> Result<DateTime<Utc>, TimestampError> {
    let secs = if raw > EPOCH_MILLIS_CUTOFF {
        raw / 1000.0
    } else {
        raw
    };
    let millis = (secs * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(TimestampError::OutOfRange(raw));
    }
    DateTime::from_timestamp_millis(millis as i64).ok_or(TimestampError::OutOfRange(raw))
}

fn parse_text(s: &str) -> Result<DateTime<Utc>, TimestampError> {
    for (format, zoned) in TEXT_FORMATS {
        if *zoned {
            if let Ok(dt) = DateTime::parse_from_str(s, format) {
                return Ok(dt.with_timezone(&Utc));
            }
        } else if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }

    // Last resort: flexible ISO-8601.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(TimestampError::Unparseable(s.to_string()))
}
