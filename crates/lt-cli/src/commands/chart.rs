//! Chart command printing the duration and interval series.

use std::io::Write;

use anyhow::{Context, Result};

use lt_core::stats;
use lt_core::time::format_duration;

use crate::Session;

pub fn run<W: Write>(writer: &mut W, session: &Session, json: bool) -> Result<()> {
    let offset = session.config.display_offset();
    let series = stats::chart_series(session.store.log(), &offset);

    if json {
        let rendered =
            serde_json::to_string_pretty(&series).context("failed to serialize chart series")?;
        writeln!(writer, "{rendered}")?;
        return Ok(());
    }

    if series.is_empty() {
        writeln!(writer, "No completed contractions to chart.")?;
        return Ok(());
    }

    writeln!(writer, "{:<8}  {:<8}  Interval", "Time", "Duration")?;
    for point in &series {
        writeln!(
            writer,
            "{:<8}  {:<8}  {}",
            point.label,
            format_duration(point.duration_seconds),
            stats::display_gap(point.interval_minutes)
        )?;
    }
    Ok(())
}
