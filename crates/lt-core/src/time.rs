//! Timestamp parsing, formatting, and floor arithmetic.
//!
//! Timestamps are held at millisecond precision so that compact payloads,
//! which carry epoch milliseconds, reproduce them exactly.

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde_json::Value;

/// Truncates a timestamp to whole milliseconds.
#[must_use]
pub fn truncate_millis(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(3)
}

/// Formats a timestamp as ISO 8601 with milliseconds (e.g. `2025-01-01T09:00:00.000Z`).
#[must_use]
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a JSON timestamp value.
///
/// Accepts RFC 3339 strings and integer epoch milliseconds. Anything else,
/// including empty strings and `null`, yields `None`.
pub fn parse_timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Parses an RFC 3339 timestamp string into UTC, truncated to milliseconds.
pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|parsed| truncate_millis(parsed.with_timezone(&Utc)))
}

/// Whole seconds between two timestamps, floored.
#[must_use]
pub fn floor_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_milliseconds().div_euclid(1000)
}

/// Whole minutes between two timestamps, floored.
#[must_use]
pub fn floor_minutes(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_milliseconds().div_euclid(60_000)
}

/// Formats a duration as `M:SS` (minutes unpadded).
#[must_use]
pub fn format_duration(seconds: i64) -> String {
    format!("{}:{:02}", seconds.div_euclid(60), seconds.rem_euclid(60))
}

/// Formats an elapsed time as the `MM:SS` timer readout.
#[must_use]
pub fn format_timer(seconds: i64) -> String {
    format!("{:02}:{:02}", seconds.div_euclid(60), seconds.rem_euclid(60))
}

/// Formats the wall-clock time of a timestamp as `HH:MM:SS` in the given zone.
pub fn format_clock<Tz: TimeZone>(timestamp: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp.with_timezone(tz).format("%H:%M:%S").to_string()
}

/// Serde helpers writing timestamps in the millisecond ISO form.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        super::parse_timestamp_value(&value)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {value}")))
    }

    /// Same as the parent module for optional timestamps (`null` when absent).
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer, de};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(timestamp) => serializer.serialize_str(&super::super::format_timestamp(*timestamp)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let value = serde_json::Value::deserialize(deserializer)?;
            if value.is_null() {
                return Ok(None);
            }
            super::super::parse_timestamp_value(&value)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {value}")))
        }
    }
}
