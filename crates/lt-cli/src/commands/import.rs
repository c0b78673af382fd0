//! Import command for replacing all data with a backup.
//!
//! File, URL and scanned imports share [`apply`]: the incoming snapshot has
//! already been validated, so what remains is the summary, the confirmation
//! and the swap.

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};

use lt_core::Snapshot;

use crate::Session;
use crate::commands::util::confirm_and_apply;

pub fn run<R: BufRead, W: Write>(
    input: &mut R,
    writer: &mut W,
    session: &mut Session,
    file: &Path,
    assume_yes: bool,
) -> Result<bool> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let snapshot = lt_core::decode_transport(&text)
        .with_context(|| format!("{} is not a valid backup", file.display()))?;
    apply(input, writer, session, snapshot, assume_yes)
}

/// Confirms and applies a validated snapshot. Returns whether it was applied.
pub fn apply<R: BufRead, W: Write>(
    input: &mut R,
    writer: &mut W,
    session: &mut Session,
    snapshot: Snapshot,
    assume_yes: bool,
) -> Result<bool> {
    let offset = session.config.display_offset();
    let confirmation = session.store.request_import(snapshot);
    let applied = confirm_and_apply(
        &mut session.store,
        &confirmation,
        input,
        writer,
        assume_yes,
        &offset,
    )?;
    if applied {
        writeln!(
            writer,
            "Imported {} contraction(s).",
            confirmation.summary.resulting_intervals
        )?;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use lt_core::{SnapshotError, TrackerError};

    use crate::session::test_support::session_in;

    const BACKUP: &str = r#"{
  "contractions": [
    {"startTime": "2025-01-02T08:10:00.000Z", "endTime": "2025-01-02T08:11:00.000Z", "intensity": 2},
    {"startTime": "2025-01-02T08:00:00.000Z", "endTime": "2025-01-02T08:00:45.000Z"}
  ],
  "notes": "from the other phone",
  "exportDate": "2025-01-02T09:00:00.000Z",
  "version": "1.1"
}"#;

    #[test]
    fn import_command_confirms_and_replaces() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("backup.json");
        std::fs::write(&file, BACKUP).unwrap();

        let mut session = session_in(temp.path());
        session.store.set_notes("old");

        let mut output = Vec::new();
        let applied = run(&mut &b"yes\n"[..], &mut output, &mut session, &file, false).unwrap();
        assert!(applied);
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Replace ALL current data with the imported data?
          Exported:     2025-01-02 09:00:00
          Contractions: 0 -> 2
          Notes:        3 -> 20 characters
        Continue? [y/N] Imported 2 contraction(s).
        ");

        let log = session.store.log();
        assert_eq!(log[0].duration_seconds(), Some(45));
        assert_eq!(log[0].intensity.value(), 3);
        assert_eq!(log[1].intensity.value(), 2);
        assert_eq!(session.store.notes(), "from the other phone");
        session.finish().unwrap();

        let session = session_in(temp.path());
        assert_eq!(session.store.log().len(), 2);
    }

    #[test]
    fn malformed_backup_changes_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("backup.json");
        std::fs::write(
            &file,
            r#"{"contractions":[{"startTime":"2025-01-02T08:10:00Z","intensity":9}],"notes":"","exportDate":"2025-01-02T09:00:00Z","version":"1.1"}"#,
        )
        .unwrap();

        let mut session = session_in(temp.path());
        session.store.set_notes("keep");

        let mut output = Vec::new();
        let err = run(&mut &b"y\n"[..], &mut output, &mut session, &file, true).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrackerError>(),
            Some(&TrackerError::MalformedSnapshot(
                SnapshotError::InvalidIntensity { index: 0 }
            ))
        );
        assert!(output.is_empty());
        assert_eq!(session.store.notes(), "keep");
    }

    #[test]
    fn declined_import_changes_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("backup.json");
        std::fs::write(&file, BACKUP).unwrap();

        let mut session = session_in(temp.path());
        let mut output = Vec::new();
        let applied = run(&mut &b"\n"[..], &mut output, &mut session, &file, false).unwrap();
        assert!(!applied);
        assert!(session.store.log().is_empty());
    }
}
