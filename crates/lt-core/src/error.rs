//! Error taxonomy for store, snapshot, and transport operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::snapshot::SnapshotError;

/// Errors returned by tracker operations.
///
/// Every variant leaves the store exactly as it was before the failing call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// A start was requested while another interval is still running.
    #[error("an interval is already in progress (started {started_at})")]
    Conflict { started_at: DateTime<Utc> },

    /// An end was requested with nothing running.
    #[error("no interval is in progress")]
    NoOpenInterval,

    /// A duration that is not a positive whole number of seconds.
    #[error("invalid duration: {input:?} (expected a positive number of seconds, e.g. 90)")]
    InvalidDuration { input: String },

    /// A duration that does not match `minutes:seconds`.
    #[error("invalid duration format: {input:?} (expected minutes:seconds, e.g. 1:30)")]
    InvalidFormat { input: String },

    /// An intensity rating outside 1..=5.
    #[error("intensity must be between 1 and 5, got {value}")]
    InvalidIntensity { value: i64 },

    /// The index does not name a completed interval in the log.
    #[error("no completed interval at index {index}")]
    IndexOutOfRange { index: usize },

    /// An imported payload failed validation.
    #[error("invalid snapshot: {0}")]
    MalformedSnapshot(#[from] SnapshotError),

    /// The compact transport string exceeds the size limit.
    #[error("payload is {len} characters, exceeding the {limit}-character transport limit")]
    PayloadTooLarge { len: usize, limit: usize },

    /// The capture device could not be opened or stopped unexpectedly.
    #[error("capture device unavailable: {reason}")]
    DeviceAccess { reason: String },

    /// The log changed between requesting and confirming an action.
    #[error("confirmation is stale; the log changed since it was requested")]
    StaleConfirmation,

    /// `confirm` was called with nothing pending.
    #[error("no confirmation is pending")]
    NoPendingConfirmation,
}
