//! The interval log store.
//!
//! [`EventLogStore`] owns the committed log (sorted by start time), the single
//! open interval, and the notes text. It has no knowledge of rendering or
//! persistence: collaborators subscribe to [`StoreEvent`]s instead.
//!
//! Destructive operations can be driven in two phases. `request_*` returns a
//! [`Confirmation`] with a summary of what will change, and [`EventLogStore::confirm`]
//! applies it. Any mutation in between invalidates the token.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::TrackerError;
use crate::interval::Interval;
use crate::snapshot::{FORMAT_VERSION, Snapshot};
use crate::time;
use crate::types::{Intensity, ManualDuration};

/// Change notifications emitted after successful mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent<'a> {
    /// The committed log changed; carries the new log.
    LogChanged(&'a [Interval]),
    /// The notes changed; carries the new text.
    NotesChanged(&'a str),
}

/// A collaborator interested in store changes.
pub trait StoreObserver {
    fn on_event(&self, event: &StoreEvent<'_>);
}

/// Opaque handle for a pending destructive action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfirmationToken(u64);

/// What a pending confirmation will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    Delete { index: usize },
    Clear,
    Import,
}

/// Before/after counts for a pending destructive action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSummary {
    pub kind: PendingKind,
    pub current_intervals: usize,
    pub current_notes_len: usize,
    pub resulting_intervals: usize,
    pub resulting_notes_len: usize,
    /// Export time of the incoming snapshot, for imports.
    pub snapshot_exported_at: Option<DateTime<Utc>>,
}

/// A requested destructive action awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub token: ConfirmationToken,
    pub summary: ChangeSummary,
}

#[derive(Debug)]
enum PendingAction {
    Delete(usize),
    Clear,
    Import(Snapshot),
}

#[derive(Debug)]
struct Pending {
    token: ConfirmationToken,
    generation: u64,
    action: PendingAction,
}

/// Owner of the interval log, open interval, and notes.
#[derive(Default)]
pub struct EventLogStore {
    log: Vec<Interval>,
    open: Option<Interval>,
    notes: String,
    observers: Vec<Box<dyn StoreObserver>>,
    pending: Option<Pending>,
    generation: u64,
    next_token: u64,
}

impl fmt::Debug for EventLogStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLogStore")
            .field("intervals", &self.log.len())
            .field("open", &self.open)
            .field("notes_len", &self.notes.len())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl EventLogStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from previously persisted state.
    ///
    /// The log is sorted by start time on the way in.
    pub fn with_state(mut log: Vec<Interval>, notes: impl Into<String>) -> Self {
        log.sort_by_key(|interval| interval.start_time);
        Self {
            log,
            notes: notes.into(),
            ..Self::default()
        }
    }

    /// Registers an observer for change notifications.
    pub fn subscribe(&mut self, observer: Box<dyn StoreObserver>) {
        self.observers.push(observer);
    }

    /// The committed log, sorted by start time.
    pub fn log(&self) -> &[Interval] {
        &self.log
    }

    /// The notes text.
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// The in-progress interval, if any.
    pub const fn open_interval(&self) -> Option<&Interval> {
        self.open.as_ref()
    }

    // === Timer ===

    /// Starts a new interval now.
    pub fn start_interval(&mut self) -> Result<&Interval, TrackerError> {
        self.start_interval_at(Utc::now())
    }

    /// Starts a new interval at `now`.
    pub fn start_interval_at(&mut self, now: DateTime<Utc>) -> Result<&Interval, TrackerError> {
        if let Some(open) = &self.open {
            return Err(TrackerError::Conflict {
                started_at: open.start_time,
            });
        }
        tracing::debug!(%now, "interval started");
        Ok(self.open.insert(Interval::open(now)))
    }

    /// Ends the open interval now.
    pub fn end_interval(&mut self, intensity: Option<i64>) -> Result<Interval, TrackerError> {
        self.end_interval_at(Utc::now(), intensity)
    }

    /// Ends the open interval at `now` and commits it to the log.
    ///
    /// An invalid intensity leaves the interval running.
    pub fn end_interval_at(
        &mut self,
        now: DateTime<Utc>,
        intensity: Option<i64>,
    ) -> Result<Interval, TrackerError> {
        let Some(open) = &self.open else {
            return Err(TrackerError::NoOpenInterval);
        };
        let intensity = intensity.map_or(Ok(open.intensity), Intensity::new)?;
        let end_time = time::truncate_millis(now).max(open.start_time);

        let mut completed = self.open.take().ok_or(TrackerError::NoOpenInterval)?;
        completed.end_time = Some(end_time);
        completed.intensity = intensity;
        self.insert_sorted(completed.clone());
        tracing::debug!(
            duration_seconds = completed.duration_seconds(),
            intensity = completed.intensity.value(),
            "interval ended"
        );
        self.log_changed();
        Ok(completed)
    }

    /// Discards the open interval without recording it.
    pub fn cancel_interval(&mut self) -> Option<Interval> {
        let cancelled = self.open.take();
        if cancelled.is_some() {
            tracing::debug!("open interval discarded");
        }
        cancelled
    }

    /// Floored seconds since the open interval started.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.open
            .as_ref()
            .map(|open| time::floor_seconds(open.start_time, now).max(0))
    }

    // === Log edits ===

    /// Records a completed interval directly.
    pub fn add_manual_interval(
        &mut self,
        start_time: DateTime<Utc>,
        duration: ManualDuration,
        intensity: Option<i64>,
    ) -> Result<&Interval, TrackerError> {
        let intensity = Intensity::or_default(intensity)?;
        let start_time = time::truncate_millis(start_time);
        let end_time = start_time
            .checked_add_signed(duration.as_delta())
            .ok_or_else(|| TrackerError::InvalidDuration {
                input: duration.seconds().to_string(),
            })?;

        let index = self.insert_sorted(Interval {
            start_time,
            end_time: Some(end_time),
            intensity,
        });
        tracing::debug!(index, seconds = duration.seconds(), "manual interval added");
        self.log_changed();
        Ok(&self.log[index])
    }

    /// Moves an interval to a new start time, keeping its exact duration.
    pub fn edit_start_time(
        &mut self,
        index: usize,
        new_start: DateTime<Utc>,
    ) -> Result<&Interval, TrackerError> {
        let (start, end) = self.completed_bounds(index)?;
        let new_start = time::truncate_millis(new_start);
        let new_end = new_start
            .checked_add_signed(end - start)
            .ok_or_else(|| TrackerError::InvalidDuration {
                input: (end - start).num_seconds().to_string(),
            })?;

        let mut interval = self.log.remove(index);
        interval.start_time = new_start;
        interval.end_time = Some(new_end);
        let new_index = self.insert_sorted(interval);
        tracing::debug!(index, new_index, "start time edited");
        self.log_changed();
        Ok(&self.log[new_index])
    }

    /// Sets the duration of a completed interval.
    ///
    /// The start time and therefore the log position are unchanged.
    pub fn edit_duration(&mut self, index: usize, seconds: i64) -> Result<&Interval, TrackerError> {
        let duration = ManualDuration::from_seconds(seconds)?;
        let (start, _) = self.completed_bounds(index)?;
        let new_end = start
            .checked_add_signed(duration.as_delta())
            .ok_or_else(|| TrackerError::InvalidDuration {
                input: seconds.to_string(),
            })?;

        self.log[index].end_time = Some(new_end);
        tracing::debug!(index, seconds, "duration edited");
        self.log_changed();
        Ok(&self.log[index])
    }

    /// Sets the intensity of a completed interval.
    pub fn edit_intensity(&mut self, index: usize, value: i64) -> Result<&Interval, TrackerError> {
        let intensity = Intensity::new(value)?;
        self.completed_bounds(index)?;

        self.log[index].intensity = intensity;
        tracing::debug!(index, value, "intensity edited");
        self.log_changed();
        Ok(&self.log[index])
    }

    /// Removes the interval at `index`.
    pub fn delete_at(&mut self, index: usize) -> Result<Interval, TrackerError> {
        if index >= self.log.len() {
            return Err(TrackerError::IndexOutOfRange { index });
        }
        let removed = self.log.remove(index);
        tracing::debug!(index, "interval deleted");
        self.log_changed();
        Ok(removed)
    }

    /// Empties the log and notes and discards any open interval.
    pub fn clear_all(&mut self) {
        self.log.clear();
        self.notes.clear();
        self.open = None;
        tracing::info!("all data cleared");
        self.log_changed();
        self.notes_changed();
    }

    /// Replaces the notes text.
    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
        self.notes_changed();
    }

    // === Snapshots ===

    /// Captures the log and notes as of now.
    pub fn export_snapshot(&self) -> Snapshot {
        self.export_snapshot_at(Utc::now())
    }

    /// Captures the log and notes, stamped with `now`.
    pub fn export_snapshot_at(&self, now: DateTime<Utc>) -> Snapshot {
        Snapshot::new(self.log.clone(), self.notes.clone(), now, FORMAT_VERSION)
    }

    /// Replaces the log and notes with a snapshot's contents.
    ///
    /// Snapshots are validated when decoded, so this cannot fail.
    pub fn import_snapshot(&mut self, snapshot: Snapshot) {
        let Snapshot {
            mut intervals,
            notes,
            ..
        } = snapshot;
        intervals.sort_by_key(|interval| interval.start_time);
        tracing::info!(intervals = intervals.len(), "snapshot imported");
        self.log = intervals;
        self.notes = notes;
        self.log_changed();
        self.notes_changed();
    }

    // === Two-phase confirmation ===

    /// Requests deletion of the interval at `index`.
    pub fn request_delete(&mut self, index: usize) -> Result<Confirmation, TrackerError> {
        if index >= self.log.len() {
            return Err(TrackerError::IndexOutOfRange { index });
        }
        let summary = self.summary(
            PendingKind::Delete { index },
            self.log.len() - 1,
            self.notes_len(),
            None,
        );
        Ok(self.register(PendingAction::Delete(index), summary))
    }

    /// Requests clearing all data.
    pub fn request_clear(&mut self) -> Confirmation {
        let summary = self.summary(PendingKind::Clear, 0, 0, None);
        self.register(PendingAction::Clear, summary)
    }

    /// Requests replacing all data with `snapshot`.
    pub fn request_import(&mut self, snapshot: Snapshot) -> Confirmation {
        let summary = self.summary(
            PendingKind::Import,
            snapshot.intervals.len(),
            snapshot.notes_len(),
            Some(snapshot.exported_at),
        );
        self.register(PendingAction::Import(snapshot), summary)
    }

    /// Applies the pending action named by `token`.
    ///
    /// The pending slot is consumed whether or not the token is still valid.
    pub fn confirm(&mut self, token: ConfirmationToken) -> Result<PendingKind, TrackerError> {
        let pending = self
            .pending
            .take()
            .ok_or(TrackerError::NoPendingConfirmation)?;
        if pending.token != token || pending.generation != self.generation {
            tracing::debug!(?token, "stale confirmation rejected");
            return Err(TrackerError::StaleConfirmation);
        }
        match pending.action {
            PendingAction::Delete(index) => {
                self.delete_at(index)?;
                Ok(PendingKind::Delete { index })
            }
            PendingAction::Clear => {
                self.clear_all();
                Ok(PendingKind::Clear)
            }
            PendingAction::Import(snapshot) => {
                self.import_snapshot(snapshot);
                Ok(PendingKind::Import)
            }
        }
    }

    /// Drops any pending action.
    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    // === Internals ===

    fn notes_len(&self) -> usize {
        self.notes.chars().count()
    }

    fn summary(
        &self,
        kind: PendingKind,
        resulting_intervals: usize,
        resulting_notes_len: usize,
        snapshot_exported_at: Option<DateTime<Utc>>,
    ) -> ChangeSummary {
        ChangeSummary {
            kind,
            current_intervals: self.log.len(),
            current_notes_len: self.notes_len(),
            resulting_intervals,
            resulting_notes_len,
            snapshot_exported_at,
        }
    }

    fn register(&mut self, action: PendingAction, summary: ChangeSummary) -> Confirmation {
        self.next_token += 1;
        let token = ConfirmationToken(self.next_token);
        self.pending = Some(Pending {
            token,
            generation: self.generation,
            action,
        });
        Confirmation { token, summary }
    }

    /// Start and end of a completed interval, or `IndexOutOfRange`.
    fn completed_bounds(&self, index: usize) -> Result<(DateTime<Utc>, DateTime<Utc>), TrackerError> {
        self.log
            .get(index)
            .and_then(|interval| interval.end_time.map(|end| (interval.start_time, end)))
            .ok_or(TrackerError::IndexOutOfRange { index })
    }

    /// Inserts after any entries with an equal start; returns the position.
    fn insert_sorted(&mut self, interval: Interval) -> usize {
        let index = self
            .log
            .partition_point(|existing| existing.start_time <= interval.start_time);
        self.log.insert(index, interval);
        index
    }

    fn log_changed(&mut self) {
        self.generation += 1;
        let event = StoreEvent::LogChanged(&self.log);
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }

    fn notes_changed(&mut self) {
        self.generation += 1;
        let event = StoreEvent::NotesChanged(&self.notes);
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}
