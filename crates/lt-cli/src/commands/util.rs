//! Shared utilities for CLI commands.

use std::io::{BufRead, Write};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;

use lt_core::{ChangeSummary, Confirmation, EventLogStore, PendingKind};

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(second|minute|hour|day)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~10 years in seconds).
const MAX_RELATIVE_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

const LOCAL_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const LOCAL_TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Parse a user-entered start time.
///
/// Supports:
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Local date and time in `offset`: "2026-01-15 10:30" or "2026-01-15 10:30:15"
/// - Local time today in `offset`: "10:30" or "10:30:15"
/// - Relative: "90 seconds ago", "5 minutes ago", "1 hour ago", "1 day ago"
pub fn parse_datetime(s: &str, offset: &FixedOffset, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Some(naive) = LOCAL_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
    {
        return local_to_utc(&naive, offset);
    }

    if let Some(time) = LOCAL_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(s, format).ok())
    {
        let today = now.with_timezone(offset).date_naive();
        return local_to_utc(&today.and_time(time), offset);
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid time: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z), local time (e.g., 10:30 or 2026-01-15 10:30) or relative (e.g., '5 minutes ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let seconds_per_unit = match &caps[2] {
        "second" => 1,
        "minute" => 60,
        "hour" => 60 * 60,
        "day" => 60 * 60 * 24,
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > MAX_RELATIVE_SECONDS / seconds_per_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now - Duration::seconds(n * seconds_per_unit))
}

fn local_to_utc(naive: &NaiveDateTime, offset: &FixedOffset) -> Result<DateTime<Utc>> {
    offset
        .from_local_datetime(naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("{naive} does not exist at offset {offset}"))
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS` in `offset`.
pub fn format_local(timestamp: DateTime<Utc>, offset: &FixedOffset) -> String {
    timestamp
        .with_timezone(offset)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Converts a 1-based entry number as shown by `lt history` to a log index.
pub fn entry_index(number: usize) -> Result<usize> {
    number
        .checked_sub(1)
        .context("entry numbers start at 1 (see `lt history`)")
}

/// Asks a yes/no question. Anything but `y`/`yes` is a no.
///
/// With `assume_yes` the prompt is skipped.
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    writer: &mut W,
    prompt: &str,
    assume_yes: bool,
) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    write!(writer, "{prompt} [y/N] ")?;
    writer.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    let answer = answer.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

/// Writes the before/after block for a pending destructive action.
pub fn render_summary<W: Write>(
    writer: &mut W,
    summary: &ChangeSummary,
    offset: &FixedOffset,
) -> Result<()> {
    match summary.kind {
        PendingKind::Delete { index } => writeln!(writer, "Delete contraction #{}?", index + 1)?,
        PendingKind::Clear => writeln!(writer, "Delete ALL contractions and notes?")?,
        PendingKind::Import => writeln!(writer, "Replace ALL current data with the imported data?")?,
    }
    if let Some(exported_at) = summary.snapshot_exported_at {
        writeln!(writer, "  Exported:     {}", format_local(exported_at, offset))?;
    }
    writeln!(
        writer,
        "  Contractions: {} -> {}",
        summary.current_intervals, summary.resulting_intervals
    )?;
    writeln!(
        writer,
        "  Notes:        {} -> {} characters",
        summary.current_notes_len, summary.resulting_notes_len
    )?;
    Ok(())
}

/// Shows the summary, asks, and applies or drops the pending action.
///
/// Returns whether the action was applied.
pub fn confirm_and_apply<R: BufRead, W: Write>(
    store: &mut EventLogStore,
    confirmation: &Confirmation,
    input: &mut R,
    writer: &mut W,
    assume_yes: bool,
    offset: &FixedOffset,
) -> Result<bool> {
    render_summary(writer, &confirmation.summary, offset)?;
    if !confirm(input, writer, "Continue?", assume_yes)? {
        store.cancel_pending();
        writeln!(writer, "Cancelled. Nothing was changed.")?;
        return Ok(false);
    }
    store.confirm(confirmation.token)?;
    Ok(true)
}
