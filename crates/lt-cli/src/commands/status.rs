//! Status command for showing the latest duration and spacing.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};

use lt_core::stats;

use crate::Session;
use crate::commands::util::format_local;

pub fn run<W: Write>(writer: &mut W, session: &Session, now: DateTime<Utc>) -> Result<()> {
    let log = session.store.log();
    let offset = session.config.display_offset();

    writeln!(writer, "Labor tracker status")?;
    writeln!(writer, "Database: {}", session.config.database_path.display())?;
    writeln!(writer, "Contractions recorded: {}", log.len())?;
    writeln!(
        writer,
        "Last duration:         {}",
        stats::display_duration(stats::last_duration(log))
    )?;
    writeln!(
        writer,
        "Time between last two: {}",
        stats::display_gap(stats::time_between_last_two(log))
    )?;

    if let Some(last) = log.last() {
        writeln!(
            writer,
            "Last started:          {} ({} min ago)",
            format_local(last.start_time, &offset),
            lt_core::time::floor_minutes(last.start_time, now).max(0)
        )?;
    }
    if !session.store.notes().is_empty() {
        writeln!(
            writer,
            "Notes:                 {} characters",
            session.store.notes().chars().count()
        )?;
    }

    Ok(())
}
