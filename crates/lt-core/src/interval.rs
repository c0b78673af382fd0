//! Recorded contraction intervals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::{self, iso_millis};
use crate::types::Intensity;

/// One recorded contraction.
///
/// Serializes as `{"startTime", "endTime", "intensity"}` with millisecond ISO
/// timestamps; this is both the persisted log format and the element format of
/// verbose snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    /// When the contraction started.
    #[serde(with = "iso_millis")]
    pub start_time: DateTime<Utc>,

    /// When the contraction ended; `None` while still in progress.
    #[serde(default, with = "iso_millis::option")]
    pub end_time: Option<DateTime<Utc>>,

    /// Intensity rating.
    #[serde(default)]
    pub intensity: Intensity,
}

impl Interval {
    /// Creates an in-progress interval starting at `start_time`.
    pub fn open(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time: time::truncate_millis(start_time),
            end_time: None,
            intensity: Intensity::MEDIUM,
        }
    }

    /// Returns true if the interval has not ended.
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Floored duration in whole seconds, or `None` while in progress.
    pub fn duration_seconds(&self) -> Option<i64> {
        self.end_time
            .map(|end| time::floor_seconds(self.start_time, end))
    }

    /// Compact `M:SS` duration, or `"In progress..."`.
    pub fn duration_display(&self) -> String {
        self.duration_seconds()
            .map_or_else(|| "In progress...".to_string(), time::format_duration)
    }
}
