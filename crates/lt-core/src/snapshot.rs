//! Snapshots: the unit of export, import, and transport.
//!
//! The verbose wire form is the backup-file document:
//!
//! ```json
//! {
//!   "contractions": [{"startTime": "...", "endTime": "...", "intensity": 3}],
//!   "notes": "...",
//!   "exportDate": "2025-01-01T09:00:00.000Z",
//!   "version": "1.1"
//! }
//! ```
//!
//! Incoming documents are validated as raw JSON before any typed conversion,
//! so failures name the offending interval and field.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::interval::Interval;
use crate::time::{self, parse_timestamp_value};
use crate::types::Intensity;

/// Format version written into verbose exports.
pub const FORMAT_VERSION: &str = "1.1";

/// Format version assigned to snapshots decoded from compact payloads.
pub const COMPACT_FORMAT_VERSION: &str = "2.0";

/// Structured reasons a payload is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The payload is not parseable JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(String),

    /// The payload is not transport-encoded text.
    #[error("payload is not valid base64 text")]
    Encoding,

    /// The top level is not an object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// A required top-level field is absent or empty.
    #[error("`{field}` is missing")]
    Missing { field: &'static str },

    /// A top-level field has the wrong JSON type.
    #[error("`{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    /// An interval element is not an object.
    #[error("interval {index} is not an object")]
    IntervalNotAnObject { index: usize },

    /// An interval timestamp is missing or unparseable.
    #[error("interval {index}: `{field}` is not a valid timestamp")]
    InvalidTimestamp { index: usize, field: &'static str },

    /// An interval ends before it starts.
    #[error("interval {index}: end time is before start time")]
    EndBeforeStart { index: usize },

    /// An interval intensity is not an integer in 1..=5.
    #[error("interval {index}: intensity must be an integer between 1 and 5")]
    InvalidIntensity { index: usize },

    /// A compact payload did not match the positional layout.
    #[error("compact payload is malformed: {0}")]
    Compact(String),
}

/// A full export unit: the interval log plus notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Intervals in ascending start order.
    pub intervals: Vec<Interval>,
    /// Free-text notes.
    pub notes: String,
    /// When the snapshot was produced.
    pub exported_at: DateTime<Utc>,
    /// Format version tag of the source document.
    pub format_version: String,
}

/// Serialization shape of a verbose backup document.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerboseDocument<'a> {
    contractions: &'a [Interval],
    notes: &'a str,
    export_date: String,
    version: &'a str,
}

impl Snapshot {
    /// Builds a snapshot, sorting intervals by start time.
    pub fn new(
        mut intervals: Vec<Interval>,
        notes: impl Into<String>,
        exported_at: DateTime<Utc>,
        format_version: impl Into<String>,
    ) -> Self {
        intervals.sort_by_key(|interval| interval.start_time);
        Self {
            intervals,
            notes: notes.into(),
            exported_at: time::truncate_millis(exported_at),
            format_version: format_version.into(),
        }
    }

    /// Number of characters in the notes text.
    pub fn notes_len(&self) -> usize {
        self.notes.chars().count()
    }

    /// Renders the verbose backup document as pretty JSON.
    pub fn to_verbose_json(&self) -> String {
        let document = VerboseDocument {
            contractions: &self.intervals,
            notes: &self.notes,
            export_date: time::format_timestamp(self.exported_at),
            version: &self.format_version,
        };
        // Plain structs with string keys always serialize.
        serde_json::to_string_pretty(&document).unwrap_or_default()
    }

    /// Parses and validates a verbose backup document.
    pub fn from_verbose_json(text: &str) -> Result<Self, SnapshotError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| SnapshotError::Json(e.to_string()))?;
        Self::from_verbose_value(&value)
    }

    /// Validates a parsed verbose document and converts it.
    pub fn from_verbose_value(value: &Value) -> Result<Self, SnapshotError> {
        validate(value)?;

        // Shape guaranteed by `validate`.
        let empty = Vec::new();
        let contractions = value
            .get("contractions")
            .and_then(Value::as_array)
            .unwrap_or(&empty);
        let mut intervals = Vec::with_capacity(contractions.len());
        for (index, element) in contractions.iter().enumerate() {
            intervals.push(verbose_interval(index, element)?);
        }

        let notes = value.get("notes").and_then(Value::as_str).unwrap_or_default();
        // `validate` only checks presence; an unreadable date falls back to the epoch.
        let exported_at = value
            .get("exportDate")
            .and_then(parse_timestamp_value)
            .unwrap_or_else(|| {
                tracing::debug!("unparseable exportDate, using the epoch");
                DateTime::UNIX_EPOCH
            });
        let format_version = match value.get("version") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => return Err(SnapshotError::Missing { field: "version" }),
        };

        Ok(Self::new(intervals, notes, exported_at, format_version))
    }

    /// File name for a backup of this snapshot, sortable by export time.
    pub fn backup_file_name(&self) -> String {
        format!(
            "labor-tracker-backup-{}.json",
            self.exported_at.format("%Y-%m-%dT%H-%M-%S")
        )
    }
}

/// Validates the structure of a verbose snapshot document.
///
/// Checks that `contractions` is an array, `notes` is a string, and
/// `exportDate` and `version` are present. Each interval must then have a
/// parseable `startTime`, an `endTime` that is absent, null, or parseable and
/// not before the start, and an `intensity` that is absent or an integer in
/// 1..=5. The first violation is returned.
pub fn validate(value: &Value) -> Result<(), SnapshotError> {
    let object = value.as_object().ok_or(SnapshotError::NotAnObject)?;

    let contractions = match object.get("contractions") {
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(SnapshotError::WrongType {
                field: "contractions",
                expected: "an array",
            });
        }
        None => return Err(SnapshotError::Missing { field: "contractions" }),
    };

    match object.get("notes") {
        Some(Value::String(_)) => {}
        Some(_) => {
            return Err(SnapshotError::WrongType {
                field: "notes",
                expected: "a string",
            });
        }
        None => return Err(SnapshotError::Missing { field: "notes" }),
    }

    require_present(object, "exportDate")?;
    require_present(object, "version")?;

    for (index, element) in contractions.iter().enumerate() {
        verbose_interval(index, element)?;
    }
    Ok(())
}

/// Rejects absent, null, empty-string, zero, and `false` values.
fn require_present(object: &Map<String, Value>, field: &'static str) -> Result<(), SnapshotError> {
    let present = match object.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::Array(_) | Value::Object(_)) => true,
    };
    if present {
        Ok(())
    } else {
        Err(SnapshotError::Missing { field })
    }
}

fn verbose_interval(index: usize, element: &Value) -> Result<Interval, SnapshotError> {
    let object = element
        .as_object()
        .ok_or(SnapshotError::IntervalNotAnObject { index })?;

    let start_time = object
        .get("startTime")
        .and_then(parse_timestamp_value)
        .ok_or(SnapshotError::InvalidTimestamp {
            index,
            field: "startTime",
        })?;

    let end_time = match object.get("endTime") {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_timestamp_value(value).ok_or(
            SnapshotError::InvalidTimestamp {
                index,
                field: "endTime",
            },
        )?),
    };
    if end_time.is_some_and(|end| end < start_time) {
        return Err(SnapshotError::EndBeforeStart { index });
    }

    let intensity = match object.get("intensity") {
        None => Intensity::MEDIUM,
        Some(value) => value
            .as_i64()
            .and_then(|v| Intensity::new(v).ok())
            .ok_or(SnapshotError::InvalidIntensity { index })?,
    };

    Ok(Interval {
        start_time,
        end_time,
        intensity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::time::parse_timestamp_str;

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp_str(s).unwrap()
    }

    fn valid_document() -> Value {
        json!({
            "contractions": [
                {"startTime": "2025-01-01T09:10:00.000Z", "endTime": "2025-01-01T09:11:00.000Z", "intensity": 4},
                {"startTime": "2025-01-01T09:00:00.000Z", "endTime": "2025-01-01T09:01:30.000Z"},
                {"startTime": "2025-01-01T09:20:00.000Z", "endTime": null, "intensity": 2}
            ],
            "notes": "Water broke at 8:45",
            "exportDate": "2025-01-01T09:30:00.000Z",
            "version": "1.1"
        })
    }

    #[test]
    fn accepts_valid_document() {
        assert_eq!(validate(&valid_document()), Ok(()));
    }

    #[test]
    fn converts_sorted_with_default_intensity() {
        let snapshot = Snapshot::from_verbose_value(&valid_document()).unwrap();
        assert_eq!(snapshot.intervals.len(), 3);
        assert_eq!(snapshot.intervals[0].start_time, ts("2025-01-01T09:00:00Z"));
        assert_eq!(snapshot.intervals[0].intensity, Intensity::MEDIUM);
        assert_eq!(snapshot.intervals[1].intensity.value(), 4);
        assert!(snapshot.intervals[2].is_open());
        assert_eq!(snapshot.notes, "Water broke at 8:45");
        assert_eq!(snapshot.format_version, "1.1");
        assert_eq!(snapshot.exported_at, ts("2025-01-01T09:30:00Z"));
    }

    #[test]
    fn unparseable_export_date_still_converts() {
        let mut doc = valid_document();
        doc["exportDate"] = json!("Jan 1st");
        assert_eq!(validate(&doc), Ok(()));

        let snapshot = Snapshot::from_verbose_value(&doc).unwrap();
        assert_eq!(snapshot.exported_at, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(snapshot.intervals.len(), 3);
    }

    #[test]
    fn rejects_non_object() {
        assert_eq!(validate(&json!([1, 2])), Err(SnapshotError::NotAnObject));
        assert_eq!(validate(&json!(null)), Err(SnapshotError::NotAnObject));
    }

    #[test]
    fn rejects_bad_top_level_fields() {
        let mut doc = valid_document();
        doc["contractions"] = json!("nope");
        assert!(matches!(
            validate(&doc),
            Err(SnapshotError::WrongType { field: "contractions", .. })
        ));

        let mut doc = valid_document();
        doc["notes"] = json!(42);
        assert!(matches!(
            validate(&doc),
            Err(SnapshotError::WrongType { field: "notes", .. })
        ));

        let mut doc = valid_document();
        doc.as_object_mut().unwrap().remove("version");
        assert_eq!(validate(&doc), Err(SnapshotError::Missing { field: "version" }));

        let mut doc = valid_document();
        doc["exportDate"] = json!("");
        assert_eq!(
            validate(&doc),
            Err(SnapshotError::Missing { field: "exportDate" })
        );
    }

    #[test]
    fn rejects_unparseable_start_time() {
        let mut doc = valid_document();
        doc["contractions"][1]["startTime"] = json!("half past nine");
        assert_eq!(
            validate(&doc),
            Err(SnapshotError::InvalidTimestamp {
                index: 1,
                field: "startTime"
            })
        );
    }

    #[test]
    fn rejects_bad_end_time() {
        let mut doc = valid_document();
        doc["contractions"][0]["endTime"] = json!("garbage");
        assert_eq!(
            validate(&doc),
            Err(SnapshotError::InvalidTimestamp {
                index: 0,
                field: "endTime"
            })
        );

        let mut doc = valid_document();
        doc["contractions"][0]["endTime"] = json!("2025-01-01T09:00:00.000Z");
        assert_eq!(validate(&doc), Err(SnapshotError::EndBeforeStart { index: 0 }));
    }

    #[test]
    fn rejects_bad_intensity() {
        for bad in [json!(0), json!(6), json!(2.5), json!("3"), json!(null)] {
            let mut doc = valid_document();
            doc["contractions"][2]["intensity"] = bad.clone();
            assert_eq!(
                validate(&doc),
                Err(SnapshotError::InvalidIntensity { index: 2 }),
                "intensity {bad} should be rejected"
            );
        }
    }

    #[test]
    fn accepts_missing_end_time_and_numeric_version() {
        let doc = json!({
            "contractions": [{"startTime": 1_735_722_000_000_i64}],
            "notes": "",
            "exportDate": "2025-01-01T09:30:00Z",
            "version": 1.1
        });
        let snapshot = Snapshot::from_verbose_value(&doc).unwrap();
        assert!(snapshot.intervals[0].is_open());
        assert_eq!(snapshot.format_version, "1.1");
    }

    #[test]
    fn verbose_json_roundtrip() {
        let snapshot = Snapshot::from_verbose_value(&valid_document()).unwrap();
        let text = snapshot.to_verbose_json();
        assert!(text.contains("\"exportDate\": \"2025-01-01T09:30:00.000Z\""));
        let parsed = Snapshot::from_verbose_json(&text).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn backup_file_name_is_sortable() {
        let snapshot = Snapshot::new(Vec::new(), "", ts("2025-03-04T05:06:07.890Z"), FORMAT_VERSION);
        assert_eq!(
            snapshot.backup_file_name(),
            "labor-tracker-backup-2025-03-04T05-06-07.json"
        );
    }

    #[test]
    fn invalid_json_reports_parse_error() {
        assert!(matches!(
            Snapshot::from_verbose_json("{not json"),
            Err(SnapshotError::Json(_))
        ));
    }
}
