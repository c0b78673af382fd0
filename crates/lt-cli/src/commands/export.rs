//! Export command writing a JSON backup file.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::Session;

/// Writes a backup of the current data and returns where it went.
///
/// A directory target (or none, meaning the current directory) gets the
/// timestamped backup file name.
pub fn run<W: Write>(
    writer: &mut W,
    session: &Session,
    output: Option<&Path>,
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    let snapshot = session.store.export_snapshot_at(now);
    let target = match output {
        Some(path) if !path.is_dir() => path.to_path_buf(),
        Some(dir) => dir.join(snapshot.backup_file_name()),
        None => PathBuf::from(snapshot.backup_file_name()),
    };

    std::fs::write(&target, snapshot.to_verbose_json())
        .with_context(|| format!("failed to write {}", target.display()))?;
    tracing::info!(path = %target.display(), intervals = snapshot.intervals.len(), "backup written");

    writeln!(
        writer,
        "Exported {} contraction(s) to {}",
        snapshot.intervals.len(),
        target.display()
    )?;
    Ok(target)
}
