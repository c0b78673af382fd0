//! Derived statistics over the interval log.
//!
//! Everything here is a pure function of a start-sorted slice of intervals
//! and is recomputed on demand. All arithmetic floors the millisecond
//! difference.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::interval::Interval;
use crate::time::{self, floor_minutes};
use crate::types::Intensity;

/// Number of entries shown in the recent history by default.
pub const DEFAULT_HISTORY_LEN: usize = 10;

/// One row of the recent history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// Position of the interval in the log (for edits and deletes).
    pub index: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub intensity: Intensity,
    /// Floored duration in seconds; `None` while in progress.
    pub duration_seconds: Option<i64>,
    /// Floored minutes since the next older entry shown; `None` for the oldest row.
    pub gap_minutes: Option<i64>,
}

/// One point of the chart series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    /// Start time as `HH:MM:SS`.
    pub label: String,
    pub duration_seconds: i64,
    /// Floored minutes since the previous completed interval started.
    pub interval_minutes: Option<i64>,
}

/// Duration of the most recent interval, if it has ended.
pub fn last_duration(log: &[Interval]) -> Option<i64> {
    log.last().and_then(Interval::duration_seconds)
}

/// Minutes between the starts of the two most recent intervals.
pub fn time_between_last_two(log: &[Interval]) -> Option<i64> {
    match log {
        [.., previous, last] => Some(floor_minutes(previous.start_time, last.start_time)),
        _ => None,
    }
}

/// The last `n` intervals, newest first, with per-row duration and gap.
pub fn recent_history(log: &[Interval], n: usize) -> Vec<HistoryEntry> {
    let first = log.len().saturating_sub(n);
    let window = &log[first..];
    window
        .iter()
        .enumerate()
        .rev()
        .map(|(offset, interval)| {
            let gap_minutes = offset
                .checked_sub(1)
                .map(|older| floor_minutes(window[older].start_time, interval.start_time));
            HistoryEntry {
                index: first + offset,
                start_time: interval.start_time,
                end_time: interval.end_time,
                intensity: interval.intensity,
                duration_seconds: interval.duration_seconds(),
                gap_minutes,
            }
        })
        .collect()
}

/// Chart series over completed intervals in chronological order.
///
/// Open intervals are skipped and do not count as a "previous" start.
pub fn chart_series<Tz: TimeZone>(log: &[Interval], tz: &Tz) -> Vec<ChartPoint>
where
    Tz::Offset: std::fmt::Display,
{
    let mut previous_start: Option<DateTime<Utc>> = None;
    let mut points = Vec::new();
    for interval in log {
        let Some(duration_seconds) = interval.duration_seconds() else {
            continue;
        };
        points.push(ChartPoint {
            label: time::format_clock(interval.start_time, tz),
            duration_seconds,
            interval_minutes: previous_start.map(|prev| floor_minutes(prev, interval.start_time)),
        });
        previous_start = Some(interval.start_time);
    }
    points
}

/// Renders an optional duration as `M:SS`, or `--` when unknown.
pub fn display_duration(seconds: Option<i64>) -> String {
    seconds.map_or_else(|| "--".to_string(), time::format_duration)
}

/// Renders an optional gap as `N min`, or `--` when unknown.
pub fn display_gap(minutes: Option<i64>) -> String {
    minutes.map_or_else(|| "--".to_string(), |m| format!("{m} min"))
}
