//! Scan command reading a share code through an external QR decoder.
//!
//! The decoder (e.g. `zbarcam --raw`) owns the camera and prints each decoded
//! code on its own line. The first line that decodes to a valid snapshot wins;
//! anything else is reported and skipped.

use std::future::Future;
use std::io::Write;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use lt_core::{Snapshot, TrackerError};

/// A running decoder process.
///
/// Dropping the session kills the decoder, releasing the capture device on
/// every exit path.
#[derive(Debug)]
pub struct ScanSession {
    child: Child,
}

impl ScanSession {
    /// Starts the decoder described by a whitespace-separated command line.
    pub fn start(command_line: &str) -> Result<Self, TrackerError> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next().ok_or_else(|| TrackerError::DeviceAccess {
            reason: "no decoder command given".to_string(),
        })?;

        let child = Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TrackerError::DeviceAccess {
                reason: format!("failed to start {program}: {e}"),
            })?;
        tracing::debug!(program, pid = child.id(), "decoder started");
        Ok(Self { child })
    }

    /// Reads decoded lines until one is a valid snapshot.
    pub async fn next_snapshot<W: Write>(&mut self, writer: &mut W) -> Result<Snapshot> {
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| TrackerError::DeviceAccess {
                reason: "decoder output is not available".to_string(),
            })?;
        let mut lines = BufReader::new(stdout).lines();

        while let Some(line) = lines
            .next_line()
            .await
            .context("failed to read decoder output")?
        {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match lt_core::decode_transport(line) {
                Ok(snapshot) => return Ok(snapshot),
                Err(error) => {
                    tracing::debug!(%error, "ignoring unrecognized code");
                    writeln!(writer, "Not a tracker code ({error}); keep scanning.")?;
                }
            }
        }

        Err(TrackerError::DeviceAccess {
            reason: "decoder stopped before a tracker code was read".to_string(),
        }
        .into())
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if let Err(error) = self.child.start_kill() {
            // Already exited.
            tracing::trace!(%error, "decoder kill skipped");
        }
        tracing::debug!("decoder released");
    }
}

/// Runs the decoder until a valid snapshot is read or `shutdown` fires.
///
/// The decoder is stopped before this returns.
pub async fn read_snapshot<W, F>(writer: &mut W, decoder: &str, shutdown: F) -> Result<Snapshot>
where
    W: Write,
    F: Future<Output = ()>,
{
    let mut session = ScanSession::start(decoder)?;
    writeln!(writer, "Scanning with `{decoder}`. Press Ctrl-C to stop.")?;

    tokio::select! {
        snapshot = session.next_snapshot(writer) => snapshot,
        () = shutdown => anyhow::bail!("scan cancelled"),
    }
}
