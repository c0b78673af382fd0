//! Edit command for correcting a recorded contraction.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use lt_core::{Intensity, ManualDuration};

use crate::commands::util::{entry_index, format_local, parse_datetime};
use crate::{EditArgs, Session};

pub fn run<W: Write>(
    writer: &mut W,
    session: &mut Session,
    args: &EditArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    let offset = session.config.display_offset();
    let mut index = entry_index(args.number)?;

    // Parse everything up front so a bad value changes nothing.
    let start = args
        .start
        .as_deref()
        .map(|s| parse_datetime(s, &offset, now))
        .transpose()?;
    let duration = args
        .duration
        .as_deref()
        .map(str::parse::<ManualDuration>)
        .transpose()
        .context("failed to parse --duration")?;
    let intensity = args.intensity.map(Intensity::new).transpose()?;

    let store = &mut session.store;
    if let Some(duration) = duration {
        store.edit_duration(index, duration.seconds())?;
    }
    if let Some(intensity) = intensity {
        store.edit_intensity(index, i64::from(intensity.value()))?;
    }
    if let Some(start) = start {
        let moved = store.edit_start_time(index, start)?.start_time;
        index = store
            .log()
            .iter()
            .rposition(|interval| interval.start_time == moved)
            .unwrap_or(index);
    }

    let edited = &store.log()[index];
    writeln!(
        writer,
        "Contraction #{}: {} lasting {} (intensity {}).",
        index + 1,
        format_local(edited.start_time, &offset),
        edited.duration_display(),
        edited.intensity
    )?;
    Ok(())
}
