//! History command listing recent contractions, newest first.

use std::io::Write;

use anyhow::{Context, Result};

use lt_core::stats::{self, HistoryEntry};
use lt_core::time::format_duration;

use crate::Session;
use crate::commands::util::format_local;

pub fn run<W: Write>(
    writer: &mut W,
    session: &Session,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let limit = limit.unwrap_or(session.config.history_limit);
    let entries = stats::recent_history(session.store.log(), limit);

    if json {
        let rendered =
            serde_json::to_string_pretty(&entries).context("failed to serialize history")?;
        writeln!(writer, "{rendered}")?;
        return Ok(());
    }

    if entries.is_empty() {
        writeln!(writer, "No contractions recorded.")?;
        return Ok(());
    }

    let offset = session.config.display_offset();
    writeln!(
        writer,
        "{:<3}  {:<19}  {:<14}  {:<10}  Interval",
        "#", "Start", "Duration", "Intensity"
    )?;
    for entry in &entries {
        writeln!(
            writer,
            "{:<3}  {:<19}  {:<14}  {:<10}  {}",
            entry.index + 1,
            format_local(entry.start_time, &offset),
            duration_cell(entry),
            entry.intensity.to_string(),
            stats::display_gap(entry.gap_minutes)
        )?;
    }
    Ok(())
}

fn duration_cell(entry: &HistoryEntry) -> String {
    entry
        .duration_seconds
        .map_or_else(|| "In progress...".to_string(), format_duration)
}
