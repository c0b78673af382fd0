//! Add command for recording a contraction after the fact.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use lt_core::ManualDuration;

use crate::Session;
use crate::commands::util::{format_local, parse_datetime};

pub fn run<W: Write>(
    writer: &mut W,
    session: &mut Session,
    at: &str,
    duration: &str,
    intensity: Option<i64>,
    now: DateTime<Utc>,
) -> Result<()> {
    let offset = session.config.display_offset();
    let start = parse_datetime(at, &offset, now)?;
    let duration: ManualDuration = duration.parse().context("failed to parse --duration")?;

    let added = session
        .store
        .add_manual_interval(start, duration, intensity)
        .context("failed to add contraction")?;

    writeln!(
        writer,
        "Added contraction at {} lasting {} (intensity {}).",
        format_local(added.start_time, &offset),
        added.duration_display(),
        added.intensity
    )?;
    Ok(())
}
