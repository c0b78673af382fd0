//! Live timer command.
//!
//! Starts an interval, redraws an `MM:SS` readout every second and waits for
//! Enter. `c` then Enter (or Ctrl-C) discards the running interval instead.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use lt_core::{Intensity, Interval, TrackerError};
use lt_core::time::format_timer;

use crate::Session;
use crate::commands::util::format_local;

/// How a timer run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerOutcome {
    Recorded(Interval),
    Cancelled,
}

enum Stop {
    End,
    Cancel,
}

pub async fn run<R, W, F>(
    input: R,
    writer: &mut W,
    session: &mut Session,
    intensity: Option<i64>,
    shutdown: F,
) -> Result<TimerOutcome>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    F: Future<Output = ()>,
{
    // Reject a bad --intensity before anything starts.
    if let Some(value) = intensity {
        Intensity::new(value)?;
    }

    let offset = session.config.display_offset();
    let started = session.store.start_interval()?.start_time;
    writeln!(
        writer,
        "Contraction started at {}. Press Enter to stop, or type c and Enter to cancel.",
        format_local(started, &offset)
    )?;

    let mut lines = input.lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    tokio::pin!(shutdown);

    let stop = loop {
        tokio::select! {
            biased;
            line = lines.next_line() => {
                let line = line.context("failed to read from stdin")?;
                match line {
                    Some(text) if text.trim().eq_ignore_ascii_case("c") => break Stop::Cancel,
                    _ => break Stop::End,
                }
            }
            () = &mut shutdown => break Stop::Cancel,
            _ = ticker.tick() => {
                let elapsed = session.store.elapsed_seconds(Utc::now()).unwrap_or_default();
                write!(writer, "\r{}", format_timer(elapsed))?;
                writer.flush()?;
            }
        }
    };
    let ended_at = Utc::now();
    writeln!(writer)?;

    if matches!(stop, Stop::Cancel) {
        session.store.cancel_interval();
        writeln!(writer, "Timer cancelled. Nothing was recorded.")?;
        return Ok(TimerOutcome::Cancelled);
    }

    let intensity = match intensity {
        Some(value) => Some(value),
        None => prompt_intensity(&mut lines, writer).await?,
    };
    let recorded = session.store.end_interval_at(ended_at, intensity)?;
    writeln!(
        writer,
        "Recorded {} (intensity {}).",
        recorded.duration_display(),
        recorded.intensity
    )?;
    Ok(TimerOutcome::Recorded(recorded))
}

/// Asks for a rating until a valid one (or nothing) is entered.
///
/// An empty answer or end of input keeps the default.
async fn prompt_intensity<R, W>(lines: &mut Lines<R>, writer: &mut W) -> Result<Option<i64>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        write!(
            writer,
            "Intensity 1-5 (1 {}, 5 {}) [{}]: ",
            Intensity::MIN.label(),
            Intensity::MAX.label(),
            Intensity::MEDIUM.value()
        )?;
        writer.flush()?;

        let Some(answer) = lines.next_line().await.context("failed to read from stdin")? else {
            writeln!(writer)?;
            return Ok(None);
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(None);
        }
        match answer.parse::<i64>() {
            Ok(value) if Intensity::new(value).is_ok() => return Ok(Some(value)),
            Ok(value) => writeln!(writer, "{}", TrackerError::InvalidIntensity { value })?,
            Err(_) => writeln!(writer, "Please enter a number from 1 to 5.")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::future;

    use crate::session::test_support::session_in;

    #[tokio::test]
    async fn enter_then_rating_records_interval() {
        let temp = tempfile::tempdir().unwrap();
        let mut session = session_in(temp.path());

        let mut output = Vec::new();
        let outcome = run(&b"\n9\nx\n4\n"[..], &mut output, &mut session, None, future::pending())
            .await
            .unwrap();

        let TimerOutcome::Recorded(interval) = outcome else {
            panic!("expected a recorded interval");
        };
        assert_eq!(interval.intensity.value(), 4);
        assert_eq!(session.store.log(), &[interval]);
        assert!(session.store.open_interval().is_none());

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("intensity must be between 1 and 5, got 9"));
        assert!(output.contains("Please enter a number from 1 to 5."));
        assert!(output.contains("Recorded 0:00 (intensity 4 - Strong)."));
        session.finish().unwrap();
    }

    #[tokio::test]
    async fn end_of_input_uses_default_rating() {
        let temp = tempfile::tempdir().unwrap();
        let mut session = session_in(temp.path());

        let mut output = Vec::new();
        let outcome = run(&b"\n"[..], &mut output, &mut session, None, future::pending())
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            TimerOutcome::Recorded(ref interval) if interval.intensity == Intensity::MEDIUM
        ));
    }

    #[tokio::test]
    async fn cancel_discards_interval() {
        let temp = tempfile::tempdir().unwrap();
        let mut session = session_in(temp.path());

        let mut output = Vec::new();
        let outcome = run(&b"c\n"[..], &mut output, &mut session, Some(2), future::pending())
            .await
            .unwrap();
        assert_eq!(outcome, TimerOutcome::Cancelled);
        assert!(session.store.log().is_empty());
        assert!(session.store.open_interval().is_none());
    }

    #[tokio::test]
    async fn shutdown_cancels_running_timer() {
        let temp = tempfile::tempdir().unwrap();
        let mut session = session_in(temp.path());
        let (_keep_open, reader) = tokio::io::duplex(64);

        let mut output = Vec::new();
        let outcome = run(
            tokio::io::BufReader::new(reader),
            &mut output,
            &mut session,
            None,
            future::ready(()),
        )
        .await
        .unwrap();
        assert_eq!(outcome, TimerOutcome::Cancelled);
        assert!(session.store.log().is_empty());
    }

    #[tokio::test]
    async fn invalid_rating_flag_does_not_start() {
        let temp = tempfile::tempdir().unwrap();
        let mut session = session_in(temp.path());

        let mut output = Vec::new();
        let err = run(&b"\n"[..], &mut output, &mut session, Some(0), future::pending())
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrackerError>(),
            Some(&TrackerError::InvalidIntensity { value: 0 })
        );
        assert!(session.store.open_interval().is_none());
        assert!(output.is_empty());
    }
}
