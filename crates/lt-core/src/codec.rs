//! Compact transport codec for share URLs and QR codes.
//!
//! A snapshot is reduced to positional tuples:
//!
//! ```json
//! {"c": [[startMillis, endMillis|null, intensity]], "n": "notes", "d": exportMillis, "v": 2}
//! ```
//!
//! serialized as JSON and base64-encoded. Decoding also accepts the verbose
//! backup document, either raw or base64-encoded, and the older
//! base64-of-percent-encoded form. The `v: 2` marker selects the layout.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::DateTime;
use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::TrackerError;
use crate::interval::Interval;
use crate::snapshot::{COMPACT_FORMAT_VERSION, Snapshot, SnapshotError};
use crate::types::Intensity;

/// Maximum length of a transport string or share URL.
pub const MAX_TRANSPORT_LEN: usize = 2000;

/// Discriminator value of the compact layout.
const COMPACT_VERSION: u8 = 2;

/// Query parameters that may carry a payload, in priority order.
const IMPORT_PARAMS: [&str; 2] = ["d", "import"];

/// One interval as `[startMillis, endMillis|null, intensity]`.
///
/// On input only the start is required; trailing elements past the third are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompactInterval(pub i64, pub Option<i64>, pub Option<i64>);

impl<'de> Deserialize<'de> for CompactInterval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TupleVisitor;

        impl<'de> Visitor<'de> for TupleVisitor {
            type Value = CompactInterval;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array [startMillis, endMillis?, intensity?]")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let start = seq
                    .next_element::<i64>()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let end = seq.next_element::<Option<i64>>()?.flatten();
                let intensity = seq.next_element::<Option<i64>>()?.flatten();
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(CompactInterval(start, end, intensity))
            }
        }

        deserializer.deserialize_seq(TupleVisitor)
    }
}

/// The compact v2 snapshot layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactSnapshot {
    #[serde(rename = "c")]
    pub intervals: Vec<CompactInterval>,
    #[serde(rename = "n", default)]
    pub notes: Option<String>,
    #[serde(rename = "d")]
    pub exported_at: i64,
    #[serde(rename = "v")]
    pub version: u8,
}

impl From<&Snapshot> for CompactSnapshot {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            intervals: snapshot
                .intervals
                .iter()
                .map(|interval| {
                    CompactInterval(
                        interval.start_time.timestamp_millis(),
                        interval.end_time.map(|end| end.timestamp_millis()),
                        Some(i64::from(interval.intensity.value())),
                    )
                })
                .collect(),
            notes: Some(snapshot.notes.clone()),
            exported_at: snapshot.exported_at.timestamp_millis(),
            version: COMPACT_VERSION,
        }
    }
}

impl CompactSnapshot {
    /// Expands the positional layout into a snapshot.
    ///
    /// A zero or null end is an open interval; a zero or null intensity is the
    /// default rating.
    pub fn into_snapshot(self) -> Result<Snapshot, SnapshotError> {
        let mut intervals = Vec::with_capacity(self.intervals.len());
        for (index, CompactInterval(start, end, intensity)) in self.intervals.into_iter().enumerate() {
            let start_time =
                DateTime::from_timestamp_millis(start).ok_or(SnapshotError::InvalidTimestamp {
                    index,
                    field: "startTime",
                })?;
            let end_time = match end {
                None | Some(0) => None,
                Some(millis) => Some(DateTime::from_timestamp_millis(millis).ok_or(
                    SnapshotError::InvalidTimestamp {
                        index,
                        field: "endTime",
                    },
                )?),
            };
            if end_time.is_some_and(|end| end < start_time) {
                return Err(SnapshotError::EndBeforeStart { index });
            }
            let intensity = match intensity {
                None | Some(0) => Intensity::MEDIUM,
                Some(value) => {
                    Intensity::new(value).map_err(|_| SnapshotError::InvalidIntensity { index })?
                }
            };
            intervals.push(Interval {
                start_time,
                end_time,
                intensity,
            });
        }

        let exported_at =
            DateTime::from_timestamp_millis(self.exported_at).ok_or(SnapshotError::WrongType {
                field: "d",
                expected: "epoch milliseconds",
            })?;

        Ok(Snapshot::new(
            intervals,
            self.notes.unwrap_or_default(),
            exported_at,
            COMPACT_FORMAT_VERSION,
        ))
    }
}

/// A decoded wire document, tagged by layout.
#[derive(Debug, Clone, PartialEq)]
pub enum WirePayload {
    /// The verbose backup document, validated on conversion.
    Verbose(Value),
    /// The compact positional layout.
    CompactV2(CompactSnapshot),
}

impl WirePayload {
    /// Dispatches on the `v` discriminator.
    pub fn from_value(value: Value) -> Result<Self, SnapshotError> {
        if value.get("v").and_then(Value::as_u64) == Some(u64::from(COMPACT_VERSION)) {
            return serde_json::from_value(value)
                .map(Self::CompactV2)
                .map_err(|e| SnapshotError::Compact(e.to_string()));
        }
        Ok(Self::Verbose(value))
    }

    /// Parses JSON text and dispatches on the layout.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        let value = serde_json::from_str(text).map_err(|e| SnapshotError::Json(e.to_string()))?;
        Self::from_value(value)
    }

    /// Validates and converts the payload into a snapshot.
    pub fn into_snapshot(self) -> Result<Snapshot, SnapshotError> {
        match self {
            Self::Verbose(value) => Snapshot::from_verbose_value(&value),
            Self::CompactV2(compact) => compact.into_snapshot(),
        }
    }
}

/// Encodes a snapshot as a compact transport string.
///
/// Fails with [`TrackerError::PayloadTooLarge`] rather than truncating.
pub fn encode(snapshot: &Snapshot) -> Result<String, TrackerError> {
    let compact = CompactSnapshot::from(snapshot);
    let json = serde_json::to_string(&compact).map_err(|e| SnapshotError::Json(e.to_string()))?;
    let encoded = BASE64.encode(json.as_bytes());
    tracing::debug!(
        json_len = json.len(),
        encoded_len = encoded.len(),
        intervals = compact.intervals.len(),
        "encoded compact payload"
    );
    check_size(encoded.len())?;
    Ok(encoded)
}

/// Builds the self-referential import URL `{base}?d={payload}`.
///
/// Any query or fragment on `base` is dropped. The full URL is subject to the
/// same size limit as the payload.
pub fn share_url(base: &Url, snapshot: &Snapshot) -> Result<Url, TrackerError> {
    let payload = encode(snapshot)?;
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.query_pairs_mut().append_pair(IMPORT_PARAMS[0], &payload);
    check_size(url.as_str().len())?;
    Ok(url)
}

fn check_size(len: usize) -> Result<(), TrackerError> {
    if len > MAX_TRANSPORT_LEN {
        tracing::warn!(len, limit = MAX_TRANSPORT_LEN, "transport payload too large");
        return Err(TrackerError::PayloadTooLarge {
            len,
            limit: MAX_TRANSPORT_LEN,
        });
    }
    Ok(())
}

/// Decodes any supported transport text into a validated snapshot.
///
/// Accepts a URL carrying a `d` or `import` parameter, a bare encoded
/// payload, or raw JSON.
pub fn decode_transport(text: &str) -> Result<Snapshot, TrackerError> {
    let text = text.trim();
    let payload = if text.starts_with('{') {
        WirePayload::from_json(text)?
    } else if let Ok(url) = Url::parse(text) {
        let encoded = import_param(&url).ok_or(SnapshotError::Missing { field: "d" })?;
        decode_payload(&encoded)?
    } else {
        decode_payload(text)?
    };
    Ok(payload.into_snapshot()?)
}

/// Returns the payload carried by a URL's import parameters, if any.
pub fn import_param(url: &Url) -> Option<String> {
    IMPORT_PARAMS.iter().find_map(|name| {
        url.query_pairs()
            .find(|(key, value)| key == *name && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    })
}

/// Removes import parameters from a URL, keeping everything else.
pub fn strip_import_params(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !IMPORT_PARAMS.contains(&&**key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(&kept);
    }
    stripped
}

/// Decodes a base64 payload into a wire document.
fn decode_payload(encoded: &str) -> Result<WirePayload, SnapshotError> {
    // Query decoding turns unescaped '+' into ' '.
    let cleaned = encoded.trim().replace(' ', "+");
    let bytes = BASE64
        .decode(cleaned.as_bytes())
        .map_err(|_| SnapshotError::Encoding)?;
    // Browser `btoa` payloads carry U+0080..=U+00FF as single Latin-1 bytes.
    let text = String::from_utf8(bytes).unwrap_or_else(|err| {
        tracing::debug!("payload is not UTF-8, reading it as Latin-1");
        err.into_bytes().into_iter().map(char::from).collect()
    });

    match serde_json::from_str::<Value>(&text) {
        Ok(value) => WirePayload::from_value(value),
        Err(err) => {
            // Older links percent-encoded the JSON before base64.
            let unescaped = urlencoding::decode(&text).map_err(|_| SnapshotError::Encoding)?;
            let value = serde_json::from_str(&unescaped)
                .map_err(|_| SnapshotError::Json(err.to_string()))?;
            tracing::debug!("decoded legacy percent-encoded payload");
            WirePayload::from_value(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Utc};
    use serde_json::json;

    use crate::snapshot::FORMAT_VERSION;
    use crate::time::parse_timestamp_str;

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp_str(s).unwrap()
    }

    fn sample_snapshot() -> Snapshot {
        Snapshot::new(
            vec![
                Interval {
                    start_time: ts("2025-01-01T09:00:00.123Z"),
                    end_time: Some(ts("2025-01-01T09:01:30.456Z")),
                    intensity: Intensity::new(2).unwrap(),
                },
                Interval {
                    start_time: ts("2025-01-01T09:10:00Z"),
                    end_time: Some(ts("2025-01-01T09:11:00Z")),
                    intensity: Intensity::new(5).unwrap(),
                },
                Interval {
                    start_time: ts("2025-01-01T09:20:00Z"),
                    end_time: None,
                    intensity: Intensity::MEDIUM,
                },
            ],
            "Contractions getting closer. Café break at 9:05 ☕",
            ts("2025-01-01T09:30:00Z"),
            FORMAT_VERSION,
        )
    }

    #[test]
    fn compact_layout_is_positional() {
        let compact = CompactSnapshot::from(&sample_snapshot());
        let value = serde_json::to_value(&compact).unwrap();
        assert_eq!(value["v"], json!(2));
        assert_eq!(value["c"][0], json!([1_735_722_000_123_i64, 1_735_722_090_456_i64, 2]));
        assert_eq!(value["c"][2], json!([1_735_723_200_000_i64, null, 3]));
        assert_eq!(value["d"], json!(1_735_723_800_000_i64));
    }

    #[test]
    fn encode_decode_roundtrip() {
        let snapshot = sample_snapshot();
        let encoded = encode(&snapshot).unwrap();
        let decoded = decode_transport(&encoded).unwrap();

        assert_eq!(decoded.intervals, snapshot.intervals);
        assert_eq!(decoded.notes, snapshot.notes);
        assert_eq!(decoded.exported_at, snapshot.exported_at);
        assert_eq!(decoded.format_version, "2.0");
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut snapshot = sample_snapshot();
        snapshot.notes = "x".repeat(MAX_TRANSPORT_LEN);
        let err = encode(&snapshot).unwrap_err();
        assert!(matches!(
            err,
            TrackerError::PayloadTooLarge { limit: MAX_TRANSPORT_LEN, .. }
        ));
    }

    #[test]
    fn share_url_roundtrip_and_size_guard() {
        let base = Url::parse("https://tracker.example/app/?stale=1#top").unwrap();
        let url = share_url(&base, &sample_snapshot()).unwrap();
        assert!(url.as_str().starts_with("https://tracker.example/app/?d="));
        assert!(url.fragment().is_none());

        let decoded = decode_transport(url.as_str()).unwrap();
        assert_eq!(decoded.intervals, sample_snapshot().intervals);

        // Payload fits on its own but the URL pushes it over the limit.
        let mut snapshot = sample_snapshot();
        snapshot.notes = "y".repeat(1372);
        assert!(encode(&snapshot).is_ok());
        assert!(matches!(
            share_url(&base, &snapshot),
            Err(TrackerError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn decodes_raw_verbose_json() {
        let text = sample_snapshot().to_verbose_json();
        let decoded = decode_transport(&text).unwrap();
        assert_eq!(decoded, sample_snapshot());
    }

    #[test]
    fn decodes_base64_verbose_json() {
        let encoded = BASE64.encode(sample_snapshot().to_verbose_json());
        let decoded = decode_transport(&encoded).unwrap();
        assert_eq!(decoded.format_version, "1.1");
        assert_eq!(decoded.intervals.len(), 3);
    }

    #[test]
    fn decodes_legacy_import_param() {
        let verbose = sample_snapshot().to_verbose_json();
        let legacy = BASE64.encode(urlencoding::encode(&verbose).as_bytes());
        let mut url = Url::parse("https://tracker.example/").unwrap();
        url.query_pairs_mut().append_pair("import", &legacy);

        let decoded = decode_transport(url.as_str()).unwrap();
        assert_eq!(decoded.notes, sample_snapshot().notes);
    }

    #[test]
    fn tolerates_unescaped_plus_in_query() {
        let encoded = encode(&sample_snapshot()).unwrap();
        let raw = format!("https://tracker.example/?d={encoded}");
        let decoded = decode_transport(&raw).unwrap();
        assert_eq!(decoded.intervals.len(), 3);
    }

    #[test]
    fn compact_falsy_values_use_defaults() {
        let text = r#"{"c":[[1735722000000,0,0],[1735722600000,null,null]],"d":1735723800000,"v":2}"#;
        let decoded = decode_transport(text).unwrap();
        assert!(decoded.intervals.iter().all(Interval::is_open));
        assert!(decoded.intervals.iter().all(|i| i.intensity == Intensity::MEDIUM));
        assert_eq!(decoded.notes, "");
    }

    #[test]
    fn compact_tuples_of_other_lengths() {
        let text = r#"{"c":[[1735722000000,1735722090000],[1735722600000],[1735723200000,1735723260000,4,"x"]],"d":1735723800000,"v":2}"#;
        let decoded = decode_transport(text).unwrap();
        assert_eq!(decoded.intervals[0].duration_seconds(), Some(90));
        assert_eq!(decoded.intervals[0].intensity, Intensity::MEDIUM);
        assert!(decoded.intervals[1].is_open());
        assert_eq!(decoded.intervals[2].intensity.value(), 4);
    }

    #[test]
    fn decodes_latin1_btoa_payload() {
        let json = r#"{"c":[[1735722000000,1735722090000,3]],"n":"Café señor","d":1735723800000,"v":2}"#;
        let latin1: Vec<u8> = json.chars().map(|c| u8::try_from(c).unwrap()).collect();
        assert!(String::from_utf8(latin1.clone()).is_err());

        let decoded = decode_transport(&BASE64.encode(&latin1)).unwrap();
        assert_eq!(decoded.notes, "Café señor");
        assert_eq!(decoded.intervals[0].duration_seconds(), Some(90));
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let cases = [
            r#"{"c":[[]],"d":1,"v":2}"#,
            r#"{"c":[["soon",null,3]],"d":1,"v":2}"#,
            r#"{"c":[[1735722000000,null,9]],"d":1,"v":2}"#,
            r#"{"c":[[1735722600000,1735722000000,3]],"d":1,"v":2}"#,
            r#"{"contractions":"nope","notes":"","exportDate":"x","version":"1"}"#,
            "!!!not base64!!!",
            "https://tracker.example/?other=1",
        ];
        for case in cases {
            assert!(
                matches!(decode_transport(case), Err(TrackerError::MalformedSnapshot(_))),
                "expected rejection for {case}"
            );
        }
    }

    #[test]
    fn strip_import_params_keeps_other_query() {
        let url = Url::parse("https://tracker.example/app?d=abc&lang=en&import=xyz").unwrap();
        assert_eq!(
            strip_import_params(&url).as_str(),
            "https://tracker.example/app?lang=en"
        );
        let only = Url::parse("https://tracker.example/app?d=abc").unwrap();
        assert_eq!(strip_import_params(&only).as_str(), "https://tracker.example/app");
    }
}
