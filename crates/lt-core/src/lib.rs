//! Core domain logic for the labor tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Recording intervals: the open timer slot, manual entries, and edits
//! - Derived statistics: durations, start-to-start gaps, history, chart series
//! - Snapshots: the export unit and its validated verbose JSON form
//! - Compact codec: the size-bounded transport used for share URLs and QR codes

pub mod codec;
mod error;
pub mod interval;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod time;
pub mod types;

pub use codec::{CompactSnapshot, MAX_TRANSPORT_LEN, WirePayload, decode_transport, encode};
pub use error::TrackerError;
pub use interval::Interval;
pub use snapshot::{FORMAT_VERSION, Snapshot, SnapshotError};
pub use store::{
    ChangeSummary, Confirmation, ConfirmationToken, EventLogStore, PendingKind, StoreEvent,
    StoreObserver,
};
pub use types::{Intensity, ManualDuration};
