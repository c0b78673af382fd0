//! Storage layer for the labor tracker.
//!
//! Persists the interval log and notes in two named slots of a `rusqlite`
//! key/value table:
//!
//! - `contractions`: JSON array of `{"startTime", "endTime", "intensity"}`
//! - `caregiverNotes`: raw notes text
//!
//! A missing slot means "no prior data", not an error. Clearing a value
//! removes its slot.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! [`Persister`] shares one via `Rc` and is meant for single-threaded use next
//! to an `EventLogStore`.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use lt_core::{EventLogStore, Interval, StoreEvent, StoreObserver};

/// Slot holding the JSON-serialized interval log.
pub const LOG_SLOT: &str = "contractions";

/// Slot holding the raw notes text.
pub const NOTES_SLOT: &str = "caregiverNotes";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored log could not be decoded.
    #[error("invalid data in slot {slot}: {source}")]
    InvalidSlot {
        slot: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// The log could not be encoded.
    #[error("failed to encode log: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Named string slots; updated_at is ISO 8601 (e.g. '2025-01-01T09:00:00.000Z')
            CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Reads a slot, returning `None` if it has never been written.
    pub fn get_slot(&self, key: &str) -> Result<Option<String>, DbError> {
        let value = self
            .conn
            .query_row("SELECT value FROM slots WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Writes a slot, replacing any previous value.
    pub fn set_slot(&self, key: &str, value: &str) -> Result<(), DbError> {
        let updated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.conn.execute(
            "
            INSERT INTO slots (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value, updated_at],
        )?;
        Ok(())
    }

    /// Deletes a slot. Removing a missing slot is not an error.
    pub fn remove_slot(&self, key: &str) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM slots WHERE key = ?", [key])?;
        Ok(())
    }

    /// Loads the persisted interval log.
    pub fn load_log(&self) -> Result<Vec<Interval>, DbError> {
        let Some(raw) = self.get_slot(LOG_SLOT)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|source| DbError::InvalidSlot {
            slot: LOG_SLOT,
            source,
        })
    }

    /// Persists the interval log. An empty log removes the slot.
    pub fn save_log(&self, log: &[Interval]) -> Result<(), DbError> {
        if log.is_empty() {
            return self.remove_slot(LOG_SLOT);
        }
        let raw = serde_json::to_string(log).map_err(DbError::Encode)?;
        self.set_slot(LOG_SLOT, &raw)
    }

    /// Loads the persisted notes, or an empty string.
    pub fn load_notes(&self) -> Result<String, DbError> {
        Ok(self.get_slot(NOTES_SLOT)?.unwrap_or_default())
    }

    /// Persists the notes. Empty notes remove the slot.
    pub fn save_notes(&self, notes: &str) -> Result<(), DbError> {
        if notes.is_empty() {
            return self.remove_slot(NOTES_SLOT);
        }
        self.set_slot(NOTES_SLOT, notes)
    }

    /// Builds a store from the persisted log and notes.
    pub fn load_store(&self) -> Result<EventLogStore, DbError> {
        let log = self.load_log()?;
        let notes = self.load_notes()?;
        tracing::debug!(intervals = log.len(), notes_len = notes.len(), "loaded state");
        Ok(EventLogStore::with_state(log, notes))
    }
}

/// Store observer that writes every change back to the database.
///
/// Writes are best-effort: a failure is logged and counted, never retried,
/// and never rolls back the in-memory change.
#[derive(Clone)]
pub struct Persister {
    db: Rc<Database>,
    failures: Rc<Cell<usize>>,
}

impl Persister {
    /// Creates a persister writing to `db`.
    pub fn new(db: Rc<Database>) -> Self {
        Self {
            db,
            failures: Rc::new(Cell::new(0)),
        }
    }

    /// Number of writes that have failed so far.
    pub fn failures(&self) -> usize {
        self.failures.get()
    }
}

impl StoreObserver for Persister {
    fn on_event(&self, event: &StoreEvent<'_>) {
        let (slot, result) = match event {
            StoreEvent::LogChanged(log) => (LOG_SLOT, self.db.save_log(log)),
            StoreEvent::NotesChanged(notes) => (NOTES_SLOT, self.db.save_notes(notes)),
        };
        match result {
            Ok(()) => tracing::debug!(slot, "persisted"),
            Err(error) => {
                self.failures.set(self.failures.get() + 1);
                tracing::warn!(slot, %error, "failed to persist change");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Utc};
    use lt_core::ManualDuration;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn missing_slots_mean_no_data() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert_eq!(db.get_slot(LOG_SLOT).unwrap(), None);
        assert!(db.load_log().unwrap().is_empty());
        assert_eq!(db.load_notes().unwrap(), "");
    }

    #[test]
    fn set_slot_overwrites() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.set_slot(NOTES_SLOT, "first").unwrap();
        db.set_slot(NOTES_SLOT, "second").unwrap();
        assert_eq!(db.get_slot(NOTES_SLOT).unwrap().as_deref(), Some("second"));

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM slots", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        db.remove_slot(NOTES_SLOT).unwrap();
        assert_eq!(db.get_slot(NOTES_SLOT).unwrap(), None);
    }

    #[test]
    fn log_is_stored_as_json_array() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let mut store = EventLogStore::new();
        store
            .add_manual_interval(
                ts("2025-01-01T09:00:00Z"),
                ManualDuration::from_seconds(90).unwrap(),
                Some(4),
            )
            .unwrap();
        db.save_log(store.log()).unwrap();

        assert_eq!(
            db.get_slot(LOG_SLOT).unwrap().as_deref(),
            Some(
                r#"[{"startTime":"2025-01-01T09:00:00.000Z","endTime":"2025-01-01T09:01:30.000Z","intensity":4}]"#
            )
        );
        assert_eq!(db.load_log().unwrap(), store.log());
    }

    #[test]
    fn corrupt_log_is_reported() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.set_slot(LOG_SLOT, "{not json").unwrap();
        assert!(matches!(
            db.load_log(),
            Err(DbError::InvalidSlot { slot: LOG_SLOT, .. })
        ));
    }

    #[test]
    fn persister_survives_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("lt.db");

        {
            let db = Rc::new(Database::open(&path).unwrap());
            let persister = Persister::new(Rc::clone(&db));
            let mut store = db.load_store().unwrap();
            store.subscribe(Box::new(persister.clone()));

            store.start_interval_at(ts("2025-01-01T09:00:00Z")).unwrap();
            store
                .end_interval_at(ts("2025-01-01T09:01:00Z"), Some(2))
                .unwrap();
            store.set_notes("Left for hospital 9:30");
            assert_eq!(persister.failures(), 0);
        }

        let db = Database::open(&path).unwrap();
        let store = db.load_store().unwrap();
        assert_eq!(store.log().len(), 1);
        assert_eq!(store.log()[0].intensity.value(), 2);
        assert_eq!(store.notes(), "Left for hospital 9:30");
        assert!(store.open_interval().is_none());
    }

    #[test]
    fn clear_removes_slots() {
        let db = Rc::new(Database::open_in_memory().unwrap());
        let mut store = EventLogStore::new();
        store.subscribe(Box::new(Persister::new(Rc::clone(&db))));

        store
            .add_manual_interval(
                ts("2025-01-01T09:00:00Z"),
                ManualDuration::from_seconds(30).unwrap(),
                None,
            )
            .unwrap();
        store.set_notes("x");
        store.clear_all();

        assert_eq!(db.get_slot(LOG_SLOT).unwrap(), None);
        assert_eq!(db.get_slot(NOTES_SLOT).unwrap(), None);
    }

    #[test]
    fn failed_writes_are_counted() {
        let db = Rc::new(Database::open_in_memory().unwrap());
        db.conn.execute_batch("DROP TABLE slots;").unwrap();
        let persister = Persister::new(Rc::clone(&db));
        let mut store = EventLogStore::new();
        store.subscribe(Box::new(persister.clone()));

        store.set_notes("lost");
        assert_eq!(persister.failures(), 1);
        // In-memory state is kept regardless.
        assert_eq!(store.notes(), "lost");
    }
}
